//! Configuration settings for dirhasher
//!
//! Defines the CLI arguments, value enums and the validated run
//! configuration shared by calculate and check modes.

use crate::error::{HasherError, Result};
use crate::manifest::ManifestSource;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default number of concurrent digest workers
pub const DEFAULT_WORKERS: usize = 15;

/// Hard cap on concurrent digest workers
pub const MAX_WORKERS: usize = 50;

/// dirhasher - concurrent checksum calculator and verifier
#[derive(Parser, Debug, Clone)]
#[command(name = "dirhasher")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Calculate or check SHA-256/MD5 checksums of files and directory trees")]
#[command(long_about = r#"
dirhasher computes content digests for files and whole directory trees using
a bounded pool of concurrent workers, and verifies them against checksum lists
in the sha256sum format ("DIGEST  path", two spaces).

Examples:
  dirhasher myfile.txt                    # Digest of one file
  dirhasher file1.txt dir1/               # Files and directory trees
  dirhasher . -o hashes.txt               # Save a manifest
  dirhasher -c hashes.txt                 # Check against a manifest
  cat hashes.txt | dirhasher -c -         # Check a manifest read from stdin
"#)]
pub struct CliArgs {
    /// Files or directories to hash; in check mode, the manifest ('-' for stdin)
    #[arg(value_name = "FILE")]
    pub paths: Vec<PathBuf>,

    /// Check digests against a manifest instead of calculating them
    #[arg(short = 'c', long)]
    pub check: bool,

    /// Write calculated digests to this file instead of stdout
    #[arg(short = 'o', long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Number of concurrent workers (values outside 1..=50 are clamped)
    #[arg(
        short = 'w',
        long,
        default_value_t = DEFAULT_WORKERS as i64,
        allow_negative_numbers = true,
        value_name = "NUM"
    )]
    pub workers: i64,

    /// Digest algorithm
    #[arg(short = 'a', long, value_enum, default_value = "sha256", value_name = "ALGO")]
    pub algorithm: HashAlgorithm,

    /// Emit lowercase hex digests (uppercase is the default)
    #[arg(long)]
    pub lowercase: bool,

    /// Sort calculated lines by path before writing them
    #[arg(long)]
    pub sort: bool,

    /// Glob pattern to exclude while walking directories (repeatable)
    #[arg(long, value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Follow symbolic links while walking directories
    #[arg(short = 'L', long)]
    pub follow_symlinks: bool,

    /// Skip hidden files and directories while walking
    #[arg(long)]
    pub skip_hidden: bool,

    /// Show a progress bar on stderr
    #[arg(short = 'p', long)]
    pub progress: bool,

    /// Verbose output (can be repeated: -v, -vv); also prints OK lines
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (only failures are printed)
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Output format for the final summary
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Digest algorithm used for hashing and manifest validation
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// SHA-256 - standard cryptographic hash
    #[default]
    #[value(name = "sha256")]
    Sha256,
    /// MD5 - legacy, lower-assurance hash
    #[value(name = "md5")]
    Md5,
}

impl HashAlgorithm {
    /// Get the output size in bytes
    pub fn output_size(&self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Md5 => 16,
        }
    }

    /// Length of the hex-encoded digest
    pub fn hex_len(&self) -> usize {
        self.output_size() * 2
    }

    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha256 => "SHA-256",
            Self::Md5 => "MD5",
        }
    }
}

/// Letter case used when rendering hex digests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DigestCase {
    /// `9C495B60...`
    #[default]
    Upper,
    /// `9c495b60...`
    Lower,
}

impl DigestCase {
    /// Hex-encode raw digest bytes in this case
    pub fn encode(&self, bytes: &[u8]) -> String {
        match self {
            Self::Upper => hex::encode_upper(bytes),
            Self::Lower => hex::encode(bytes),
        }
    }
}

/// Output format for the final summary
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON format
    Json,
}

/// What a run does
#[derive(Debug, Clone)]
pub enum RunMode {
    /// Hash the given files and directory trees
    Calculate {
        /// Files and directories named on the command line
        inputs: Vec<PathBuf>,
    },
    /// Verify the entries of a manifest
    Check {
        /// Where the manifest is read from
        source: ManifestSource,
    },
}

/// Validated configuration for a run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Calculate or check
    pub mode: RunMode,
    /// Concurrent workers, already clamped
    pub workers: usize,
    /// Digest algorithm
    pub algorithm: HashAlgorithm,
    /// Case of emitted digests
    pub case: DigestCase,
    /// Output file for calculated digests (None = stdout)
    pub output: Option<PathBuf>,
    /// Sort calculated lines by path
    pub sort: bool,
    /// Follow symlinks while walking
    pub follow_symlinks: bool,
    /// Include hidden files while walking
    pub include_hidden: bool,
    /// Exclude patterns for the walk
    pub exclude_patterns: Vec<String>,
    /// Progress bar requested
    pub progress: bool,
    /// Verbosity level
    pub verbose: u8,
    /// Quiet mode
    pub quiet: bool,
    /// Summary format
    pub format: OutputFormat,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::Calculate { inputs: Vec::new() },
            workers: DEFAULT_WORKERS,
            algorithm: HashAlgorithm::Sha256,
            case: DigestCase::Upper,
            output: None,
            sort: false,
            follow_symlinks: false,
            include_hidden: true,
            exclude_patterns: Vec::new(),
            progress: false,
            verbose: 0,
            quiet: false,
            format: OutputFormat::Text,
        }
    }
}

/// Clamp a requested worker count into `1..=MAX_WORKERS`.
///
/// Non-positive requests fall back to [`DEFAULT_WORKERS`]; requests above the
/// cap become [`MAX_WORKERS`]. Never an error.
pub fn clamp_workers(requested: i64) -> usize {
    if requested < 1 {
        DEFAULT_WORKERS
    } else if requested > MAX_WORKERS as i64 {
        MAX_WORKERS
    } else {
        requested as usize
    }
}

impl RunConfig {
    /// Create config from CLI arguments
    pub fn from_cli(args: &CliArgs) -> Result<Self> {
        let mode = if args.check {
            match args.paths.as_slice() {
                [] => RunMode::Check {
                    source: ManifestSource::Stdin,
                },
                [manifest] => RunMode::Check {
                    source: ManifestSource::from_arg(manifest),
                },
                _ => {
                    return Err(HasherError::config(
                        "in check mode (-c), provide at most one argument (the manifest path or '-' for stdin)",
                    ))
                }
            }
        } else {
            if args.paths.is_empty() {
                return Err(HasherError::config(
                    "no files or directories specified for calculation",
                ));
            }
            RunMode::Calculate {
                inputs: args.paths.clone(),
            }
        };

        if args.check && args.output.is_some() {
            return Err(HasherError::config("--output only applies to calculate mode"));
        }

        Ok(Self {
            mode,
            workers: clamp_workers(args.workers),
            algorithm: args.algorithm,
            case: if args.lowercase {
                DigestCase::Lower
            } else {
                DigestCase::Upper
            },
            output: args.output.clone(),
            sort: args.sort,
            follow_symlinks: args.follow_symlinks,
            include_hidden: !args.skip_hidden,
            exclude_patterns: args.exclude.clone(),
            progress: args.progress,
            verbose: args.verbose,
            quiet: args.quiet,
            format: args.format,
        })
    }
}
