//! Progress reporter implementation
//!
//! Uses indicatif for a file-count bar with throughput display. The bar is
//! fed by the aggregating consumer, one tick per outcome.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Progress reporter for hashing runs
pub struct ProgressReporter {
    /// File count progress bar
    files_bar: ProgressBar,
    /// Start time
    start_time: Instant,
    /// Bytes hashed so far
    bytes_hashed: AtomicU64,
}

impl ProgressReporter {
    /// Create a new progress reporter drawing to stderr
    pub fn new() -> Self {
        let files_bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr());
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{prefix:.bold.dim} [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%) {msg}")
        {
            files_bar.set_style(style.progress_chars("=> "));
        }
        files_bar.set_prefix("Hashing");

        Self {
            files_bar,
            start_time: Instant::now(),
            bytes_hashed: AtomicU64::new(0),
        }
    }

    /// Create a disabled progress reporter (for quiet mode)
    pub fn disabled() -> Self {
        let reporter = Self::new();
        reporter.files_bar.set_draw_target(ProgressDrawTarget::hidden());
        reporter
    }

    /// Set total files to hash
    pub fn set_total_files(&self, total: u64) {
        self.files_bar.set_length(total);
    }

    /// Record one finished file and the bytes it contributed
    pub fn record_file(&self, bytes: u64) {
        let total = self.bytes_hashed.fetch_add(bytes, Ordering::Relaxed) + bytes;
        self.files_bar.inc(1);
        self.files_bar.set_message(format!(
            "{}/s",
            humansize::format_size(self.throughput_for(total) as u64, humansize::BINARY)
        ));
    }

    fn throughput_for(&self, bytes: u64) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            bytes as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Finish progress with success message
    pub fn finish_success(&self, message: &str) {
        self.files_bar.finish_with_message(format!("✓ {}", message));
    }

    /// Finish progress with error message
    pub fn finish_error(&self, message: &str) {
        self.files_bar.abandon_with_message(format!("✗ {}", message));
    }

    /// Run `f` with the bar hidden, so console lines don't tear it
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        self.files_bar.suspend(f)
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}
