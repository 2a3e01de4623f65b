//! Outcome reconciliation and the final report

use super::scheduler::{DigestOutcome, OutcomeStream};
use crate::config::OutputFormat;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// A file that could not be hashed
#[derive(Debug, Clone, Serialize)]
pub struct FailureRecord {
    /// Display path
    pub path: String,
    /// Error text
    pub reason: String,
}

/// Aggregated result of a run
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregateReport {
    /// Outcomes expected
    pub total: u64,
    /// Files hashed (and matching, in check mode)
    pub succeeded: u64,
    /// Files whose digest differs from the manifest
    pub mismatched: u64,
    /// Files that could not be hashed
    pub errored: u64,
    /// Malformed manifest lines that were skipped
    pub skipped_lines: u64,
    /// Content bytes hashed
    pub bytes_hashed: u64,
    /// Wall time of the run
    pub duration: Duration,
    /// Paths that mismatched
    pub mismatches: Vec<String>,
    /// Paths that failed, with reasons
    pub failures: Vec<FailureRecord>,
}

impl AggregateReport {
    /// Fold one outcome into the counters
    pub fn record(&mut self, outcome: &DigestOutcome) {
        self.bytes_hashed += outcome.bytes;

        if let Some(failure) = &outcome.failure {
            self.errored += 1;
            self.failures.push(FailureRecord {
                path: outcome.path.clone(),
                reason: failure.to_string(),
            });
            return;
        }

        match outcome.matched {
            Some(false) => {
                self.mismatched += 1;
                self.mismatches.push(outcome.path.clone());
            }
            Some(true) => self.succeeded += 1,
            None if outcome.computed.is_some() => self.succeeded += 1,
            None => {}
        }
    }

    /// Count an error that happened outside the scheduler, e.g. during the walk
    pub fn record_external_error(&mut self, path: impl Into<String>, reason: impl Into<String>) {
        self.total += 1;
        self.errored += 1;
        self.failures.push(FailureRecord {
            path: path.into(),
            reason: reason.into(),
        });
    }

    /// No mismatches and no errors
    pub fn is_success(&self) -> bool {
        self.mismatched == 0 && self.errored == 0
    }

    /// Process exit code for this report
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    /// Bytes per second over the run
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.bytes_hashed as f64 / secs
        } else {
            0.0
        }
    }

    /// Print the summary to stderr; stdout carries manifest lines
    pub fn print_summary(&self, format: OutputFormat) {
        match format {
            OutputFormat::Json => match serde_json::to_string_pretty(self) {
                Ok(json) => eprintln!("{}", json),
                Err(e) => warn!("failed to serialize summary: {}", e),
            },
            OutputFormat::Text => self.print_text_summary(),
        }
    }

    fn print_text_summary(&self) {
        if self.skipped_lines > 0 {
            eprintln!(
                "WARNING: {} {} improperly formatted",
                self.skipped_lines,
                plural(self.skipped_lines, "line is", "lines are")
            );
        }
        if self.errored > 0 {
            eprintln!(
                "WARNING: {} listed {} could not be read",
                self.errored,
                plural(self.errored, "file", "files")
            );
        }
        if self.mismatched > 0 {
            eprintln!(
                "WARNING: {} computed {} did NOT match",
                self.mismatched,
                plural(self.mismatched, "checksum", "checksums")
            );
        }

        eprintln!("\n=== Summary ===");
        eprintln!("Processed:       {}", self.total);
        eprintln!("Valid:           {}", self.succeeded);
        eprintln!("Invalid:         {}", self.mismatched);
        eprintln!("Errors:          {}", self.errored);
        eprintln!("Bytes hashed:    {}", humansize::format_size(self.bytes_hashed, humansize::BINARY));
        eprintln!("Duration:        {:.2?}", self.duration);
        eprintln!(
            "Throughput:      {}/s",
            humansize::format_size(self.throughput() as u64, humansize::BINARY)
        );
    }
}

fn plural(n: u64, one: &'static str, many: &'static str) -> &'static str {
    if n == 1 {
        one
    } else {
        many
    }
}

/// Console line for an outcome, in `sha256sum -c` style.
///
/// `OK` lines are only produced when `verbose` is set.
pub fn describe_outcome(outcome: &DigestOutcome, verbose: bool) -> Option<String> {
    if let Some(failure) = &outcome.failure {
        return Some(format!("{}: FAILED open or read ({})", outcome.path, failure));
    }
    match outcome.matched {
        Some(false) => Some(format!("{}: FAILED", outcome.path)),
        Some(true) if verbose => Some(format!("{}: OK", outcome.path)),
        _ => None,
    }
}

/// Single consumer of an outcome stream
pub struct Reconciler {
    report: AggregateReport,
    started: Instant,
}

impl Reconciler {
    /// Start reconciling; the run duration is measured from here
    pub fn new() -> Self {
        Self {
            report: AggregateReport::default(),
            started: Instant::now(),
        }
    }

    /// Start from an existing report, e.g. one already holding walk errors
    pub fn with_report(report: AggregateReport) -> Self {
        Self {
            report,
            started: Instant::now(),
        }
    }

    /// Drain `stream`, calling `on_outcome` for every outcome before it is
    /// counted.
    pub fn consume<F>(mut self, stream: OutcomeStream, mut on_outcome: F) -> AggregateReport
    where
        F: FnMut(&DigestOutcome),
    {
        let expected = stream.expected() as u64;
        let mut seen = 0u64;
        self.report.total += expected;

        for outcome in stream {
            seen += 1;
            on_outcome(&outcome);
            self.report.record(&outcome);
        }

        if seen < expected {
            warn!(missing = expected - seen, "outcome stream closed early");
            self.report.errored += expected - seen;
        }

        self.report.duration = self.started.elapsed();
        debug!(
            succeeded = self.report.succeeded,
            mismatched = self.report.mismatched,
            errored = self.report.errored,
            "reconciliation finished"
        );
        self.report
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}

/// Drain a stream into a fresh report
pub fn reconcile<F>(stream: OutcomeStream, on_outcome: F) -> AggregateReport
where
    F: FnMut(&DigestOutcome),
{
    Reconciler::new().consume(stream, on_outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HashAlgorithm;
    use crate::core::{build_check_tasks, Scheduler};
    use crate::error::HasherError;
    use crate::hash::{hash_bytes, DigestEngine};
    use crate::manifest::ManifestEntry;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn outcome(path: &str, matched: Option<bool>, failure: Option<HasherError>) -> DigestOutcome {
        DigestOutcome {
            path: path.to_string(),
            computed: failure.is_none().then(|| "AB".repeat(32)),
            matched,
            failure,
            bytes: 10,
        }
    }

    fn entry(data: &[u8], path: &str) -> ManifestEntry {
        ManifestEntry {
            digest: hash_bytes(data, HashAlgorithm::Sha256),
            path: path.to_string(),
        }
    }

    #[test]
    fn test_record_counts() {
        let mut report = AggregateReport::default();
        report.record(&outcome("a", Some(true), None));
        report.record(&outcome("b", Some(false), None));
        report.record(&outcome("c", None, Some(HasherError::NotFound(PathBuf::from("c")))));
        report.record(&outcome("d", None, None));

        assert_eq!(report.succeeded, 2);
        assert_eq!(report.mismatched, 1);
        assert_eq!(report.errored, 1);
        assert_eq!(report.bytes_hashed, 30);
        assert_eq!(report.mismatches, vec!["b".to_string()]);
        assert_eq!(report.failures[0].path, "c");
        assert!(!report.is_success());
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn test_empty_report_succeeds() {
        let report = AggregateReport::default();
        assert!(report.is_success());
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn test_external_error_fails_run() {
        let mut report = AggregateReport::default();
        report.record_external_error("gone/", "No such file or directory");
        assert_eq!(report.total, 1);
        assert_eq!(report.errored, 1);
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn test_describe_outcome() {
        assert_eq!(
            describe_outcome(&outcome("x.txt", Some(false), None), false).as_deref(),
            Some("x.txt: FAILED")
        );
        assert_eq!(describe_outcome(&outcome("x.txt", Some(true), None), false), None);
        assert_eq!(
            describe_outcome(&outcome("x.txt", Some(true), None), true).as_deref(),
            Some("x.txt: OK")
        );

        let line = describe_outcome(
            &outcome("gone.txt", None, Some(HasherError::NotFound(PathBuf::from("gone.txt")))),
            false,
        )
        .unwrap();
        assert!(line.starts_with("gone.txt: FAILED open or read"));
    }

    #[test]
    fn test_reconcile_match_mismatch_missing() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("same.txt"), b"unchanged").unwrap();
        std::fs::write(dir.path().join("changed.txt"), b"edited").unwrap();

        let entries = vec![
            entry(b"unchanged", "same.txt"),
            entry(b"original", "changed.txt"),
            entry(b"whatever", "missing.txt"),
        ];
        let tasks = build_check_tasks(entries, dir.path());
        let engine = Arc::new(DigestEngine::new(HashAlgorithm::Sha256));
        let stream = Scheduler::new(3).dispatch(tasks, engine).unwrap();

        let mut lines = Vec::new();
        let report = reconcile(stream, |o| lines.extend(describe_outcome(o, false)));

        assert_eq!(report.total, 3);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.mismatched, 1);
        assert_eq!(report.errored, 1);
        assert_eq!(report.exit_code(), 1);

        lines.sort();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "changed.txt: FAILED");
        assert!(lines[1].starts_with("missing.txt: FAILED open or read"));
    }

    #[test]
    fn test_reconcile_all_match() {
        let dir = TempDir::new().unwrap();
        let mut entries = Vec::new();
        for i in 0..10 {
            let data = format!("file number {i}");
            std::fs::write(dir.path().join(format!("{i}.txt")), &data).unwrap();
            entries.push(entry(data.as_bytes(), &format!("{i}.txt")));
        }

        let engine = Arc::new(DigestEngine::new(HashAlgorithm::Sha256));
        let stream = Scheduler::new(4)
            .dispatch(build_check_tasks(entries, dir.path()), engine)
            .unwrap();
        let report = Reconciler::new().consume(stream, |_| {});

        assert_eq!(report.succeeded, 10);
        assert!(report.is_success());
    }

    #[test]
    fn test_report_serializes() {
        let mut report = AggregateReport::default();
        report.record(&outcome("b", Some(false), None));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["mismatched"], 1);
        assert_eq!(json["mismatches"][0], "b");
    }
}
