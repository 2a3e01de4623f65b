//! Error types for dirhasher
//!
//! This module defines all error types used throughout the crate. Per-file
//! errors travel inside digest outcomes and are folded into the aggregate
//! report; only configuration and manifest-read errors abort a run.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for dirhasher operations
#[derive(Error, Debug)]
pub enum HasherError {
    /// I/O error during file operations
    #[error("I/O error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File or directory not found
    #[error("No such file or directory: {0}")]
    NotFound(PathBuf),

    /// Permission denied
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The manifest stream itself could not be read
    #[error("Failed to read manifest at line {line}: {source}")]
    ManifestRead {
        line: usize,
        #[source]
        source: std::io::Error,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Thread pool error
    #[error("Thread pool error: {0}")]
    ThreadPoolError(String),

    /// A worker panicked while hashing a file
    #[error("Worker panicked while hashing '{0}'")]
    WorkerPanicked(PathBuf),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<HasherError>,
    },
}

impl HasherError {
    /// Create an I/O error with path context.
    ///
    /// Missing files and permission failures get their own variants so the
    /// per-file report names the problem plainly.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.into()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.into()),
            _ => Self::Io {
                path: path.into(),
                source,
            },
        }
    }

    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }
}

/// Result type alias for dirhasher operations
pub type Result<T> = std::result::Result<T, HasherError>;

/// Extension trait for adding path context to std::io::Result
pub trait IoResultExt<T> {
    /// Add path context to an I/O error
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| HasherError::io(path, e))
    }
}
