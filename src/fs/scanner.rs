//! Input enumeration for calculate mode
//!
//! Expands file and directory arguments into a flat list of files. Files are
//! returned with the path prefix the user typed, so manifest lines stay
//! relative when the inputs were relative.

use crate::error::{HasherError, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Result of enumerating the inputs
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    /// Files to hash, in walk order
    pub files: Vec<PathBuf>,
    /// Inputs or entries that could not be read, with the path they concern
    pub errors: Vec<ScanError>,
}

/// An input or directory entry the walk could not read
#[derive(Debug, Clone)]
pub struct ScanError {
    /// Offending path
    pub path: String,
    /// Error text
    pub reason: String,
}

/// Configuration for input enumeration
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Follow symbolic links to directories
    pub follow_symlinks: bool,
    /// Include dot-files and dot-directories below each root
    pub include_hidden: bool,
    /// Glob patterns for files and directories to leave out
    pub exclude_patterns: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            include_hidden: true,
            exclude_patterns: Vec::new(),
        }
    }
}

/// Recursive file enumerator
pub struct Scanner {
    config: ScanConfig,
    exclude_matcher: GlobSet,
}

impl Scanner {
    /// Create a new scanner with the given configuration
    pub fn new(config: ScanConfig) -> Result<Self> {
        let exclude_matcher = Self::build_globset(&config.exclude_patterns)?;
        Ok(Self {
            config,
            exclude_matcher,
        })
    }

    fn build_globset(patterns: &[String]) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern)
                .map_err(|e| HasherError::config(format!("Invalid glob pattern '{}': {}", pattern, e)))?;
            builder.add(glob);
        }
        builder
            .build()
            .map_err(|e| HasherError::config(format!("Failed to build glob set: {}", e)))
    }

    /// Expand every input into the files it names
    pub fn scan(&self, inputs: &[PathBuf]) -> ScanResult {
        let mut result = ScanResult::default();

        for input in inputs {
            let metadata = match std::fs::metadata(input) {
                Ok(m) => m,
                Err(e) => {
                    warn!("skipping {}: {}", input.display(), e);
                    result.errors.push(ScanError {
                        path: input.display().to_string(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            if metadata.is_dir() {
                self.walk(input, &mut result);
            } else {
                // Named explicitly, so neither hidden nor exclude rules apply.
                result.files.push(input.clone());
            }
        }

        debug!(
            files = result.files.len(),
            errors = result.errors.len(),
            "scan finished"
        );
        result
    }

    fn walk(&self, root: &Path, result: &mut ScanResult) {
        let walker = WalkDir::new(root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| self.keep(entry, root));

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    let path = err
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| root.display().to_string());
                    warn!("cannot read {}: {}", path, err);
                    result.errors.push(ScanError {
                        path,
                        reason: err.to_string(),
                    });
                    continue;
                }
            };

            let file_type = entry.file_type();
            if file_type.is_file() || (file_type.is_symlink() && entry.path().is_file()) {
                result.files.push(entry.into_path());
            }
        }
    }

    fn keep(&self, entry: &DirEntry, root: &Path) -> bool {
        if entry.depth() == 0 {
            return true;
        }
        if !self.config.include_hidden && is_hidden(entry) {
            return false;
        }
        if self.exclude_matcher.is_empty() {
            return true;
        }

        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        !(self.exclude_matcher.is_match(relative) || self.exclude_matcher.is_match(entry.file_name()))
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}
