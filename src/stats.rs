//! Run-wide counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Pairs run so far and the run's start time.
///
/// The failed count lives in [`FailureLog`](crate::failures::FailureLog),
/// under the same lock as the records it counts.
#[derive(Debug)]
pub struct RunStats {
    started: Instant,
    total_run: AtomicU64,
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStats {
    /// Start the clock with nothing run yet.
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            total_run: AtomicU64::new(0),
        }
    }

    /// Count one completed pair.
    pub fn record_run(&self) {
        self.total_run.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of pairs that completed, whatever their outcome.
    pub fn total_run(&self) -> u64 {
        self.total_run.load(Ordering::Acquire)
    }

    /// Time since the run started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Final numbers for a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub failed: u64,
    pub total: u64,
    pub elapsed: Duration,
    pub log: crate::failures::LogDisposition,
}

impl RunSummary {
    /// True when no pair failed.
    pub fn passed(&self) -> bool {
        self.failed == 0
    }

    /// Process exit code: 0 when every pair succeeded, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.passed() {
            0
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failures::LogDisposition;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_record_run_from_many_threads() {
        let stats = Arc::new(RunStats::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let stats = stats.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        stats.record_run();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("join");
        }
        assert_eq!(stats.total_run(), 800);
    }

    #[test]
    fn test_summary_exit_code() {
        let mut summary = RunSummary {
            failed: 0,
            total: 3,
            elapsed: Duration::from_millis(5),
            log: LogDisposition::Removed,
        };
        assert_eq!(summary.exit_code(), 0);

        summary.failed = 1;
        assert!(!summary.passed());
        assert_eq!(summary.exit_code(), 1);
    }
}
