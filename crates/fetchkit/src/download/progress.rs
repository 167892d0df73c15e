//! Progress tracking for streaming transfers

use std::time::{Duration, Instant};

use tracing::info;

const REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Accounts for every chunk moved by the copy loop and logs a structured
/// progress report at most once per second, plus an unconditional final
/// report on the write that completes a known-length transfer.
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    transferred: u64,
    total: Option<u64>,
    started: Instant,
    last_report: Option<Instant>,
}

impl ProgressTracker {
    pub(crate) fn new(total: Option<u64>) -> Self {
        Self {
            transferred: 0,
            total,
            started: Instant::now(),
            last_report: None,
        }
    }

    pub(crate) fn record(&mut self, bytes: u64) {
        self.transferred += bytes;

        if self
            .last_report
            .is_none_or(|at| at.elapsed() >= REPORT_INTERVAL)
        {
            self.last_report = Some(Instant::now());
            self.report("downloading");
        }

        if self.total == Some(self.transferred) {
            self.report("download complete");
        }
    }

    fn report(&self, message: &str) {
        let elapsed = self.started.elapsed();
        let rate = format!("{:.2} MiB/s", self.rate_mib(elapsed));

        match self.total {
            Some(total) if total > 0 => {
                let percent = format!("{:.1}%", self.transferred as f64 / total as f64 * 100.0);
                info!(
                    progress = %percent,
                    elapsed = ?elapsed,
                    transferred = self.transferred,
                    total,
                    rate = %rate,
                    "{message}",
                );
            }
            _ => {
                info!(
                    progress = "unknown",
                    elapsed = ?elapsed,
                    transferred = self.transferred,
                    rate = %rate,
                    "{message}",
                );
            }
        }
    }

    fn rate_mib(&self, elapsed: Duration) -> f64 {
        let secs = elapsed.as_secs_f64();
        if secs > 0.0 {
            self.transferred as f64 / secs / (1024.0 * 1024.0)
        } else {
            0.0
        }
    }
}
