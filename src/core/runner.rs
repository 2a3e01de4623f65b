//! Run orchestration
//!
//! Ties the pieces together for the two modes:
//!
//! - calculate: scan inputs, hash every file, write `DIGEST  path` lines
//! - check: parse a manifest, hash every listed file, compare
//!
//! Both end in an [`AggregateReport`]. Only errors that prevent the run from
//! starting (bad configuration, unreadable manifest, unwritable output) are
//! returned as `Err`; per-file problems are counted in the report.

use super::report::{describe_outcome, AggregateReport, Reconciler};
use super::scheduler::{build_calculate_tasks, build_check_tasks, Scheduler};
use crate::config::{RunConfig, RunMode};
use crate::error::{HasherError, Result};
use crate::fs::{ScanConfig, Scanner};
use crate::hash::DigestEngine;
use crate::manifest::{parse_manifest, ManifestSource, ManifestWriter};
use crate::progress::ProgressReporter;
use console::style;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Executes a configured run
pub struct HashRunner {
    /// Configuration
    config: RunConfig,
    /// Shared digest engine
    engine: Arc<DigestEngine>,
    /// Progress reporter
    progress: ProgressReporter,
}

impl HashRunner {
    /// Create a runner for the given configuration
    pub fn new(config: RunConfig) -> Self {
        let engine = Arc::new(DigestEngine::new(config.algorithm).with_case(config.case));
        Self {
            config,
            engine,
            progress: ProgressReporter::disabled(),
        }
    }

    /// Attach a progress reporter
    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Run in the configured mode
    pub fn execute(&self) -> Result<AggregateReport> {
        info!(
            algorithm = self.config.algorithm.name(),
            workers = self.config.workers,
            "starting run"
        );

        let report = match &self.config.mode {
            RunMode::Check { source } => self.check(source),
            RunMode::Calculate { inputs } => self
                .calculate(inputs, || ManifestWriter::create(self.config.output.as_deref()))
                .map(|(report, _)| report),
        };

        match &report {
            Ok(r) if r.is_success() => self.progress.finish_success("done"),
            Ok(_) => self.progress.finish_error("completed with failures"),
            Err(_) => self.progress.finish_error("aborted"),
        }
        report
    }

    /// Verify the entries of a manifest
    pub fn check(&self, source: &ManifestSource) -> Result<AggregateReport> {
        let reader = source
            .open()
            .map_err(|e| e.with_context(format!("Failed to open manifest {}", source.label())))?;
        self.check_reader(reader, &source.base_dir(), &source.label())
    }

    /// Verify a manifest read from `reader`; relative entries resolve against `base`
    pub fn check_reader<R: BufRead>(&self, reader: R, base: &Path, label: &str) -> Result<AggregateReport> {
        let parsed = parse_manifest(reader, self.config.algorithm)
            .map_err(|e| e.with_context(format!("Failed to read manifest {}", label)))?;
        info!(manifest = label, entries = parsed.len(), skipped = parsed.skipped.len(), "checking manifest");

        let mut report = AggregateReport {
            skipped_lines: parsed.skipped.len() as u64,
            ..Default::default()
        };
        if parsed.is_empty() {
            debug!("manifest has no entries");
            return Ok(report);
        }

        let tasks = build_check_tasks(parsed.entries, base);
        self.progress.set_total_files(tasks.len() as u64);

        let scheduler = Scheduler::new(self.config.workers as i64);
        let stream = scheduler.dispatch(tasks, Arc::clone(&self.engine))?;

        let verbose = self.config.verbose > 0;
        let quiet = self.config.quiet;
        report = Reconciler::with_report(report).consume(stream, |outcome| {
            self.progress.record_file(outcome.bytes);
            if let Some(line) = describe_outcome(outcome, verbose && !quiet) {
                let line = if outcome.is_ok() { style(line).green() } else { style(line).red() };
                self.progress.suspend(|| println!("{}", line));
            }
        });

        debug!(peak_in_flight = scheduler.gate().peak(), "check finished");
        Ok(report)
    }

    /// Hash the given inputs and write manifest lines to the writer `open_sink`
    /// returns.
    ///
    /// The sink is opened only after the inputs are scanned, and the
    /// configured output file is never hashed into its own manifest.
    /// Returns the report together with the writer, flushed.
    pub fn calculate<W, F>(&self, inputs: &[PathBuf], open_sink: F) -> Result<(AggregateReport, W)>
    where
        W: Write,
        F: FnOnce() -> Result<ManifestWriter<W>>,
    {
        let scanner = Scanner::new(ScanConfig {
            follow_symlinks: self.config.follow_symlinks,
            include_hidden: self.config.include_hidden,
            exclude_patterns: self.config.exclude_patterns.clone(),
        })?;
        let scan = scanner.scan(inputs);

        let mut report = AggregateReport::default();
        for error in &scan.errors {
            eprintln!("dirhasher: {}: {}", error.path, error.reason);
            report.record_external_error(error.path.clone(), error.reason.clone());
        }

        let files = without_output_file(scan.files, self.config.output.as_deref());
        let mut writer = open_sink()?;

        let tasks = build_calculate_tasks(files);
        self.progress.set_total_files(tasks.len() as u64);
        info!(files = tasks.len(), "hashing files");

        let scheduler = Scheduler::new(self.config.workers as i64);
        let stream = scheduler.dispatch(tasks, Arc::clone(&self.engine))?;

        let sort = self.config.sort;
        let mut pending: Vec<(String, String)> = Vec::new();
        let mut write_error: Option<HasherError> = None;

        report = Reconciler::with_report(report).consume(stream, |outcome| {
            self.progress.record_file(outcome.bytes);

            if let Some(failure) = &outcome.failure {
                self.progress
                    .suspend(|| eprintln!("dirhasher: {}: {}", outcome.path, failure));
                return;
            }
            let Some(digest) = &outcome.computed else {
                return;
            };

            if sort {
                pending.push((outcome.path.clone(), digest.clone()));
            } else if write_error.is_none() {
                if let Err(e) = writer.write_entry(digest, &outcome.path) {
                    write_error = Some(e);
                }
            }
        });

        if let Some(e) = write_error {
            return Err(e.with_context("Failed to write checksums"));
        }

        pending.sort();
        for (path, digest) in &pending {
            writer
                .write_entry(digest, path)
                .map_err(|e| e.with_context("Failed to write checksums"))?;
        }

        debug!(lines = writer.lines_written(), "calculate finished");
        let inner = writer
            .finish()
            .map_err(|e| e.with_context("Failed to write checksums"))?;
        Ok((report, inner))
    }
}

/// Drop `output` from `files` if the scan picked it up
fn without_output_file(files: Vec<PathBuf>, output: Option<&Path>) -> Vec<PathBuf> {
    let Some(target) = output.and_then(|p| p.canonicalize().ok()) else {
        return files;
    };

    files
        .into_iter()
        .filter(|file| {
            if file.file_name() != target.file_name() {
                return true;
            }
            let same = file.canonicalize().map(|c| c == target).unwrap_or(false);
            if same {
                debug!(path = %file.display(), "leaving output file out of its own manifest");
            }
            !same
        })
        .collect()
}
