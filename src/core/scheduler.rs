//! Bounded work scheduling
//!
//! Every file becomes a [`DigestTask`] submitted straight onto a rayon pool.
//! Each dispatch gets its own pool of `workers` threads, while the
//! [`AdmissionGate`] belongs to the [`Scheduler`]: batches dispatched
//! concurrently from one scheduler share its permits, so at most `workers`
//! digests are in flight across all of them. Each task emits exactly one
//! [`DigestOutcome`] on a channel sized to the task count; the
//! [`OutcomeStream`] ends only after every task has reported.
//!
//! Outcomes arrive in completion order, not submission order.

use super::gate::AdmissionGate;
use crate::config::clamp_workers;
use crate::error::{HasherError, Result};
use crate::hash::{DigestEngine, FileDigest};
use crate::manifest::{resolve_entry_path, ManifestEntry};
use crossbeam::channel::{bounded, Receiver};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// A single file to hash, optionally with the digest it should have
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestTask {
    /// Path opened for hashing
    pub path: PathBuf,
    /// Path as the user wrote it, used in reports and output
    pub display: String,
    /// Expected uppercase digest (check mode)
    pub expected: Option<String>,
}

impl DigestTask {
    /// A calculate-mode task
    pub fn calculate(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let display = match path.to_str() {
            Some(s) => s.to_owned(),
            None => {
                let lossy = path.to_string_lossy().into_owned();
                warn!("{} is not valid UTF-8; its manifest line cannot be checked later", lossy);
                lossy
            }
        };
        Self {
            display,
            path,
            expected: None,
        }
    }

    /// A check-mode task for a manifest entry, resolved against `base`
    pub fn check(entry: ManifestEntry, base: &Path) -> Self {
        Self {
            path: resolve_entry_path(&entry.path, base),
            display: entry.path,
            expected: Some(entry.digest),
        }
    }
}

/// Build calculate-mode tasks for a list of files
pub fn build_calculate_tasks(files: Vec<PathBuf>) -> Vec<DigestTask> {
    files.into_iter().map(DigestTask::calculate).collect()
}

/// Build check-mode tasks for manifest entries
pub fn build_check_tasks(entries: Vec<ManifestEntry>, base: &Path) -> Vec<DigestTask> {
    entries
        .into_iter()
        .map(|entry| DigestTask::check(entry, base))
        .collect()
}

/// Result of one task
#[derive(Debug)]
pub struct DigestOutcome {
    /// Display path of the task
    pub path: String,
    /// Digest computed from the file, if it could be read
    pub computed: Option<String>,
    /// Whether the digest matched the expected one (check mode only)
    pub matched: Option<bool>,
    /// Why the file could not be hashed
    pub failure: Option<HasherError>,
    /// Content bytes hashed
    pub bytes: u64,
}

impl DigestOutcome {
    fn from_digest(task: &DigestTask, digest: FileDigest) -> Self {
        // Both sides are hex; comparing case-insensitively keeps lowercase
        // engines compatible with uppercase manifests.
        let matched = task
            .expected
            .as_ref()
            .map(|expected| expected.eq_ignore_ascii_case(&digest.hex));

        Self {
            path: task.display.clone(),
            computed: Some(digest.hex),
            matched,
            failure: None,
            bytes: digest.bytes,
        }
    }

    fn failed(path: String, failure: HasherError) -> Self {
        Self {
            path,
            computed: None,
            matched: None,
            failure: Some(failure),
            bytes: 0,
        }
    }

    /// Digest computed and, where expected, matching
    pub fn is_ok(&self) -> bool {
        self.failure.is_none() && self.matched != Some(false)
    }

    /// Digest computed but different from the expected one
    pub fn is_mismatch(&self) -> bool {
        self.matched == Some(false)
    }
}

/// Dispatches digest tasks over a bounded pool of workers
pub struct Scheduler {
    workers: usize,
    gate: Arc<AdmissionGate>,
}

impl Scheduler {
    /// Create a scheduler; `workers` is clamped into `1..=MAX_WORKERS`
    pub fn new(workers: i64) -> Self {
        let workers = clamp_workers(workers);
        Self {
            workers,
            gate: Arc::new(AdmissionGate::new(workers)),
        }
    }

    /// Effective worker count
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// The admission gate, for instrumentation
    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    /// Launch every task and return the stream of their outcomes
    pub fn dispatch(&self, tasks: Vec<DigestTask>, engine: Arc<DigestEngine>) -> Result<OutcomeStream> {
        self.dispatch_with(tasks, move |path: &Path| engine.compute_digest(path))
    }

    fn dispatch_with<D>(&self, tasks: Vec<DigestTask>, digest: D) -> Result<OutcomeStream>
    where
        D: Fn(&Path) -> Result<FileDigest> + Send + Sync + 'static,
    {
        let digest = Arc::new(digest);
        let expected = tasks.len();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("digest-worker-{}", i))
            .build()
            .map_err(|e| HasherError::ThreadPoolError(e.to_string()))?;

        let (sender, receiver) = bounded(expected.max(1));
        debug!(tasks = expected, workers = self.workers, "dispatching digest tasks");

        for task in tasks {
            let sender = sender.clone();
            let gate = Arc::clone(&self.gate);
            let digest = Arc::clone(&digest);

            pool.spawn(move || {
                let outcome = run_task(&gate, &*digest, task);
                // The stream may already be gone; the outcome has nowhere to go.
                let _ = sender.send(outcome);
            });
        }
        drop(sender);

        Ok(OutcomeStream {
            receiver,
            expected,
            received: 0,
            _pool: pool,
        })
    }
}

fn run_task<D>(gate: &AdmissionGate, digest: &D, task: DigestTask) -> DigestOutcome
where
    D: Fn(&Path) -> Result<FileDigest>,
{
    let display = task.display.clone();
    let path = task.path.clone();

    match panic::catch_unwind(AssertUnwindSafe(|| execute_task(gate, digest, &task))) {
        Ok(outcome) => outcome,
        Err(_) => DigestOutcome::failed(display, HasherError::WorkerPanicked(path)),
    }
}

fn execute_task<D>(gate: &AdmissionGate, digest: &D, task: &DigestTask) -> DigestOutcome
where
    D: Fn(&Path) -> Result<FileDigest>,
{
    let digest = {
        let _permit = match gate.acquire() {
            Ok(permit) => permit,
            Err(e) => return DigestOutcome::failed(task.display.clone(), e),
        };
        digest(&task.path)
    };

    match digest {
        Ok(digest) => DigestOutcome::from_digest(task, digest),
        Err(e) => {
            debug!(path = %task.path.display(), error = %e, "digest failed");
            DigestOutcome::failed(task.display.clone(), e)
        }
    }
}

/// Outcomes of a dispatched batch, in completion order
pub struct OutcomeStream {
    receiver: Receiver<DigestOutcome>,
    expected: usize,
    received: usize,
    _pool: rayon::ThreadPool,
}

impl OutcomeStream {
    /// Number of outcomes the batch will produce
    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Outcomes not yet received
    pub fn remaining(&self) -> usize {
        self.expected - self.received
    }
}

impl Iterator for OutcomeStream {
    type Item = DigestOutcome;

    fn next(&mut self) -> Option<DigestOutcome> {
        if self.received == self.expected {
            return None;
        }
        let outcome = self.receiver.recv().ok()?;
        self.received += 1;
        Some(outcome)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HashAlgorithm, MAX_WORKERS};
    use crate::hash::hash_bytes;
    use std::collections::HashSet;
    use std::time::Duration;
    use tempfile::TempDir;

    fn make_files(dir: &Path, count: usize) -> Vec<PathBuf> {
        (0..count)
            .map(|i| {
                let path = dir.join(format!("file_{i}.txt"));
                std::fs::write(&path, format!("content of file {i}").repeat(200)).unwrap();
                path
            })
            .collect()
    }

    fn engine() -> Arc<DigestEngine> {
        Arc::new(DigestEngine::new(HashAlgorithm::Sha256))
    }

    #[test]
    fn test_worker_clamping() {
        assert_eq!(Scheduler::new(0).workers(), 15);
        assert_eq!(Scheduler::new(4).workers(), 4);
        assert_eq!(Scheduler::new(1000).workers(), MAX_WORKERS);
        assert_eq!(Scheduler::new(1000).gate().capacity(), MAX_WORKERS);
    }

    #[test]
    fn test_exactly_one_outcome_per_task() {
        let dir = TempDir::new().unwrap();
        let files = make_files(dir.path(), 40);

        for workers in [1, 3, 15, 50] {
            let scheduler = Scheduler::new(workers);
            let tasks = build_calculate_tasks(files.clone());
            let stream = scheduler.dispatch(tasks, engine()).unwrap();
            assert_eq!(stream.expected(), 40);

            let outcomes: Vec<_> = stream.collect();
            assert_eq!(outcomes.len(), 40);

            let paths: HashSet<_> = outcomes.iter().map(|o| o.path.clone()).collect();
            assert_eq!(paths.len(), 40);
            assert!(outcomes.iter().all(|o| o.is_ok() && o.matched.is_none()));

            assert!(scheduler.gate().peak() <= workers as usize);
            assert_eq!(scheduler.gate().in_flight(), 0);
        }
    }

    #[test]
    fn test_empty_batch() {
        let scheduler = Scheduler::new(4);
        let mut stream = scheduler.dispatch(Vec::new(), engine()).unwrap();
        assert_eq!(stream.expected(), 0);
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_failures_do_not_starve_the_pool() {
        let dir = TempDir::new().unwrap();
        let mut files = make_files(dir.path(), 5);
        for i in 0..20 {
            files.push(dir.path().join(format!("missing_{i}.bin")));
        }

        let scheduler = Scheduler::new(2);
        let outcomes: Vec<_> = scheduler
            .dispatch(build_calculate_tasks(files), engine())
            .unwrap()
            .collect();

        assert_eq!(outcomes.len(), 25);
        assert_eq!(outcomes.iter().filter(|o| o.failure.is_some()).count(), 20);
        assert_eq!(scheduler.gate().available(), 2);
    }

    #[test]
    fn test_check_tasks_compare_digests() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("good.txt"), b"good").unwrap();
        std::fs::write(dir.path().join("bad.txt"), b"bad").unwrap();

        let entries = vec![
            ManifestEntry {
                digest: hash_bytes(b"good", HashAlgorithm::Sha256),
                path: "good.txt".to_string(),
            },
            ManifestEntry {
                digest: hash_bytes(b"not bad", HashAlgorithm::Sha256),
                path: "bad.txt".to_string(),
            },
        ];

        let tasks = build_check_tasks(entries, dir.path());
        assert_eq!(tasks[0].path, dir.path().join("good.txt"));
        assert_eq!(tasks[0].display, "good.txt");

        let mut outcomes: Vec<_> = Scheduler::new(2).dispatch(tasks, engine()).unwrap().collect();
        outcomes.sort_by(|a, b| a.path.cmp(&b.path));

        assert_eq!(outcomes[0].path, "bad.txt");
        assert!(outcomes[0].is_mismatch());
        assert_eq!(outcomes[1].path, "good.txt");
        assert_eq!(outcomes[1].matched, Some(true));
    }

    #[test]
    fn test_lowercase_engine_matches_uppercase_manifest() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"abc").unwrap();

        let engine = Arc::new(
            DigestEngine::new(HashAlgorithm::Sha256).with_case(crate::config::DigestCase::Lower),
        );
        let tasks = build_check_tasks(
            vec![ManifestEntry {
                digest: hash_bytes(b"abc", HashAlgorithm::Sha256),
                path: "a.txt".to_string(),
            }],
            dir.path(),
        );

        let outcomes: Vec<_> = Scheduler::new(1).dispatch(tasks, engine).unwrap().collect();
        assert_eq!(outcomes[0].matched, Some(true));
    }

    #[test]
    fn test_panicking_task_becomes_error_outcome() {
        let tasks: Vec<_> = (0..12)
            .map(|i| DigestTask::calculate(format!("file_{i}.bin")))
            .chain(std::iter::once(DigestTask::calculate("boom.bin")))
            .collect();

        let scheduler = Scheduler::new(3);
        let outcomes: Vec<_> = scheduler
            .dispatch_with(tasks, |path: &Path| {
                if path.ends_with("boom.bin") {
                    panic!("reader blew up");
                }
                Ok(FileDigest {
                    hex: "00".repeat(32),
                    bytes: 1,
                })
            })
            .unwrap()
            .collect();

        assert_eq!(outcomes.len(), 13);
        let panicked: Vec<_> = outcomes
            .iter()
            .filter(|o| matches!(o.failure, Some(HasherError::WorkerPanicked(_))))
            .collect();
        assert_eq!(panicked.len(), 1);
        assert_eq!(panicked[0].path, "boom.bin");
        assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 12);

        assert_eq!(scheduler.gate().available(), 3);
        assert_eq!(scheduler.gate().in_flight(), 0);
    }

    #[test]
    fn test_concurrent_batches_share_the_gate() {
        let scheduler = Scheduler::new(2);
        let slow_digest = |_: &Path| -> Result<FileDigest> {
            std::thread::sleep(Duration::from_millis(20));
            Ok(FileDigest {
                hex: "00".repeat(32),
                bytes: 0,
            })
        };
        let batch = |prefix: &str| -> Vec<DigestTask> {
            (0..6)
                .map(|i| DigestTask::calculate(format!("{prefix}_{i}")))
                .collect()
        };

        let counts = std::thread::scope(|s| {
            let a = s.spawn(|| scheduler.dispatch_with(batch("a"), slow_digest).unwrap().count());
            let b = s.spawn(|| scheduler.dispatch_with(batch("b"), slow_digest).unwrap().count());
            (a.join().unwrap(), b.join().unwrap())
        });

        assert_eq!(counts, (6, 6));
        assert!(scheduler.gate().peak() <= 2);
        assert_eq!(scheduler.gate().available(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_name_is_displayed_lossily() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let path = PathBuf::from(OsStr::from_bytes(b"caf\xe9.txt"));
        let task = DigestTask::calculate(path.clone());

        assert_eq!(task.path, path);
        assert_eq!(task.display, "caf\u{FFFD}.txt");
        assert_eq!(DigestTask::calculate("plain.txt").display, "plain.txt");
    }
}
