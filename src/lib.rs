//! # dirhasher - Concurrent checksum calculation and verification
//!
//! dirhasher computes SHA-256 (or MD5) digests for single files, file lists
//! and whole directory trees, and verifies them against checksum manifests in
//! the `sha256sum` format (`DIGEST  path`, two spaces).
//!
//! ## Features
//!
//! - **Bounded parallelism**: a fixed pool of workers behind an admission gate
//! - **Pooled state**: hashers and 64 KiB read buffers are reused across files
//! - **Tolerant manifests**: comments, blank and malformed lines are skipped
//! - **Scriptable exit codes**: non-zero on any mismatch or unreadable file
//!
//! ## Calculating digests
//!
//! ```no_run
//! use dirhasher::config::{RunConfig, RunMode};
//! use dirhasher::core::HashRunner;
//! use std::path::PathBuf;
//!
//! let config = RunConfig {
//!     mode: RunMode::Calculate { inputs: vec![PathBuf::from("data")] },
//!     workers: 8,
//!     ..Default::default()
//! };
//!
//! let report = HashRunner::new(config).execute().unwrap();
//! println!("{} files hashed", report.succeeded);
//! ```
//!
//! ## Checking a manifest
//!
//! ```no_run
//! use dirhasher::config::{OutputFormat, RunConfig, RunMode};
//! use dirhasher::core::HashRunner;
//! use dirhasher::manifest::ManifestSource;
//! use dirhasher::progress::ProgressReporter;
//!
//! let config = RunConfig {
//!     mode: RunMode::Check { source: ManifestSource::from_arg("release/SHA256SUMS") },
//!     ..Default::default()
//! };
//!
//! let runner = HashRunner::new(config).with_progress(ProgressReporter::new());
//! let report = runner.execute().unwrap();
//! report.print_summary(OutputFormat::Text);
//! std::process::exit(report.exit_code());
//! ```
//!
//! ## Hashing a single file
//!
//! ```no_run
//! use dirhasher::config::HashAlgorithm;
//! use dirhasher::hash::DigestEngine;
//! use std::path::Path;
//!
//! let engine = DigestEngine::new(HashAlgorithm::Sha256);
//! let digest = engine.compute_digest(Path::new("notes.txt")).unwrap();
//! println!("{}  notes.txt", digest.hex);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod core;
pub mod error;
pub mod fs;
pub mod hash;
pub mod manifest;
pub mod progress;

// Re-export commonly used types
pub use config::{HashAlgorithm, RunConfig, RunMode};
pub use core::{AggregateReport, HashRunner};
pub use error::{HasherError, Result};
pub use progress::ProgressReporter;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    //! Convenient re-exports for common usage
    //!
    //! ```no_run
    //! use dirhasher::prelude::*;
    //! ```

    pub use crate::config::{DigestCase, HashAlgorithm, OutputFormat, RunConfig, RunMode};
    pub use crate::core::{
        build_calculate_tasks, build_check_tasks, reconcile, AggregateReport, DigestOutcome, DigestTask,
        HashRunner, Reconciler, Scheduler,
    };
    pub use crate::error::{HasherError, Result};
    pub use crate::fs::{ScanConfig, Scanner};
    pub use crate::hash::{hash_bytes, DigestEngine, FileDigest};
    pub use crate::manifest::{parse_manifest, ManifestEntry, ManifestSource, ManifestWriter};
    pub use crate::progress::ProgressReporter;
}
