//! completion-percentage and request-rate accounting
use std::time::{Duration, Instant};

use tracing::instrument;

/// default sliding measurement window
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(500);

/// youngest window age divided through directly; below this the counter is
/// divided by the floor instead, so the near-zero denominator can't explode
/// the figure while a startup burst still registers against the ceiling
const MIN_SAMPLE: Duration = Duration::from_millis(50);

/// tracks completions, errors, and a moving request-rate estimate
///
/// mutated only by the engine loop, single-threaded; the rate estimate is a
/// sliding window that resets after the configured duration so the display
/// reflects recent throughput rather than the lifetime average
#[derive(Clone, Debug)]
pub struct ProgressTracker {
    total_requests: usize,
    completed: usize,
    errors: usize,
    window: Duration,
    window_start: Instant,
    window_completed: usize,
    last_rate: f64,
}

impl ProgressTracker {
    /// create a tracker for a run of `total_requests` planned requests
    ///
    /// the plan comes from the iteration strategy's cardinality, computed
    /// once at startup
    #[must_use]
    pub fn new(total_requests: usize, window: Duration) -> Self {
        Self {
            total_requests,
            completed: 0,
            errors: 0,
            window,
            window_start: Instant::now(),
            window_completed: 0,
            last_rate: 0.0,
        }
    }

    /// record one harvested completion; `is_error` marks transport-level
    /// failures, which only bump the error counter and never abort the run
    #[instrument(skip_all, level = "trace")]
    pub fn record_completion(&mut self, is_error: bool) {
        self.completed += 1;
        self.window_completed += 1;

        if is_error {
            self.errors += 1;
        }

        let elapsed = self.window_start.elapsed();

        if elapsed >= self.window {
            self.last_rate = self.window_completed as f64 / elapsed.as_secs_f64();
            self.window_start = Instant::now();
            self.window_completed = 0;
        }
    }

    /// completions-in-window divided by window seconds
    ///
    /// while the current window is still young, completions are divided by a
    /// fixed floor and the previous window's rate is kept when it was higher,
    /// so a freshly reset window never reads as a lull and an opening burst
    /// never reads as idle
    #[must_use]
    pub fn rate(&self) -> f64 {
        let elapsed = self.window_start.elapsed();

        if elapsed < MIN_SAMPLE {
            let floored = self.window_completed as f64 / MIN_SAMPLE.as_secs_f64();
            return floored.max(self.last_rate);
        }

        self.window_completed as f64 / elapsed.as_secs_f64()
    }

    /// completed / total-planned × 100
    #[must_use]
    pub fn percentage(&self) -> f64 {
        if self.total_requests == 0 {
            return 100.0;
        }

        (self.completed as f64 / self.total_requests as f64) * 100.0
    }

    /// number of harvested completions so far
    #[must_use]
    pub const fn completed(&self) -> usize {
        self.completed
    }

    /// number of transport-level failures so far
    #[must_use]
    pub const fn errors(&self) -> usize {
        self.errors
    }

    /// total planned requests for this run
    #[must_use]
    pub const fn total_requests(&self) -> usize {
        self.total_requests
    }
}
