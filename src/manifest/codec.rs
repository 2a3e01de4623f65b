//! Checksum-list codec
//!
//! Reads and writes manifests in the `sha256sum` dialect: one entry per line,
//! a hex digest, exactly two spaces, then the path. Blank lines and lines
//! starting with `#` are ignored. Malformed lines are logged and skipped so a
//! damaged manifest degrades to fewer checked entries instead of aborting.

use crate::config::HashAlgorithm;
use crate::error::{HasherError, IoResultExt, Result};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Separator between digest and path
pub const FIELD_SEPARATOR: &str = "  ";

/// One `digest  path` line of a manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Uppercase hex digest
    pub digest: String,
    /// Path as written in the manifest, trimmed
    pub path: String,
}

/// Why a line was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No two-space separator
    MissingSeparator,
    /// Separator present but nothing after it
    EmptyPath,
    /// Digest is not hex of the algorithm's length
    InvalidDigest,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingSeparator => write!(f, "missing two-space separator"),
            Self::EmptyPath => write!(f, "empty path"),
            Self::InvalidDigest => write!(f, "invalid digest"),
        }
    }
}

/// A malformed line that was skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    /// 1-based line number
    pub line_number: usize,
    /// Trimmed line content
    pub content: String,
    /// Reason it was skipped
    pub reason: SkipReason,
}

/// Result of parsing a manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedManifest {
    /// Well-formed entries in file order
    pub entries: Vec<ManifestEntry>,
    /// Malformed lines that were dropped
    pub skipped: Vec<SkippedLine>,
}

impl ParsedManifest {
    /// Number of entries to check
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when there is nothing to check
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

enum ParsedLine {
    Ignored,
    Entry(ManifestEntry),
    Malformed(SkipReason),
}

fn parse_line(line: &str, algorithm: HashAlgorithm) -> ParsedLine {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return ParsedLine::Ignored;
    }

    let Some((digest, path)) = line.split_once(FIELD_SEPARATOR) else {
        return ParsedLine::Malformed(SkipReason::MissingSeparator);
    };
    let (digest, path) = (digest.trim(), path.trim());

    if path.is_empty() {
        return ParsedLine::Malformed(SkipReason::EmptyPath);
    }
    if !is_valid_digest(digest, algorithm) {
        return ParsedLine::Malformed(SkipReason::InvalidDigest);
    }

    ParsedLine::Entry(ManifestEntry {
        digest: digest.to_ascii_uppercase(),
        path: path.to_string(),
    })
}

/// Check that `digest` is hex of exactly the algorithm's length
pub fn is_valid_digest(digest: &str, algorithm: HashAlgorithm) -> bool {
    digest.len() == algorithm.hex_len() && digest.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Parse a manifest from a buffered reader.
///
/// Only a failure to read the stream is an error; malformed lines are
/// reported in [`ParsedManifest::skipped`].
pub fn parse_manifest<R: BufRead>(mut reader: R, algorithm: HashAlgorithm) -> Result<ParsedManifest> {
    let mut parsed = ParsedManifest::default();
    let mut raw = Vec::new();
    let mut line_number = 0usize;

    loop {
        raw.clear();
        let read = reader
            .read_until(b'\n', &mut raw)
            .map_err(|source| HasherError::ManifestRead {
                line: line_number + 1,
                source,
            })?;
        if read == 0 {
            break;
        }
        line_number += 1;

        let line = String::from_utf8_lossy(&raw);
        match parse_line(&line, algorithm) {
            ParsedLine::Ignored => {}
            ParsedLine::Entry(entry) => parsed.entries.push(entry),
            ParsedLine::Malformed(reason) => {
                let content = line.trim().to_string();
                warn!(
                    "Skipping line {} ({}): {}",
                    line_number, reason, content
                );
                parsed.skipped.push(SkippedLine {
                    line_number,
                    content,
                    reason,
                });
            }
        }
    }

    debug!(
        entries = parsed.entries.len(),
        skipped = parsed.skipped.len(),
        lines = line_number,
        "manifest parsed"
    );
    Ok(parsed)
}

/// Render one manifest line, including the trailing newline
pub fn format_line(digest: &str, path: &str) -> String {
    format!("{digest}{FIELD_SEPARATOR}{path}\n")
}

/// Buffered writer of manifest lines
pub struct ManifestWriter<W: Write> {
    inner: BufWriter<W>,
    sink: PathBuf,
    lines_written: usize,
}

impl ManifestWriter<Box<dyn Write + Send>> {
    /// Open the output sink: the named file, or stdout when `output` is None
    pub fn create(output: Option<&Path>) -> Result<Self> {
        match output {
            Some(path) => {
                let file = std::fs::File::create(path).with_path(path)?;
                Ok(Self::with_sink_name(Box::new(file), path))
            }
            None => Ok(Self::with_sink_name(Box::new(std::io::stdout()), "<stdout>")),
        }
    }
}

impl<W: Write> ManifestWriter<W> {
    /// Wrap a writer
    pub fn new(inner: W) -> Self {
        Self::with_sink_name(inner, "<output>")
    }

    fn with_sink_name(inner: W, sink: impl Into<PathBuf>) -> Self {
        Self {
            inner: BufWriter::new(inner),
            sink: sink.into(),
            lines_written: 0,
        }
    }

    /// Write one `digest  path` line
    pub fn write_entry(&mut self, digest: &str, path: &str) -> Result<()> {
        self.inner
            .write_all(format_line(digest, path).as_bytes())
            .with_path(&self.sink)?;
        self.lines_written += 1;
        Ok(())
    }

    /// Lines written so far
    pub fn lines_written(&self) -> usize {
        self.lines_written
    }

    /// Flush and return the inner writer
    pub fn finish(self) -> Result<W> {
        let sink = self.sink;
        self.inner
            .into_inner()
            .map_err(|e| HasherError::io(&sink, e.into_error()))
    }
}
