//! Throughput samples.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::time::Instant;

/// Messages observed over one sampling window.
#[derive(Debug, Clone, PartialEq)]
pub struct ThroughputSample {
    pub window_start: Instant,
    pub window_end: Instant,
    pub message_count: u64,
    pub reported_at: DateTime<Local>,
}

impl ThroughputSample {
    pub fn new(window_start: Instant, window_end: Instant, message_count: u64) -> Self {
        Self {
            window_start,
            window_end,
            message_count,
            reported_at: Local::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.window_end.saturating_duration_since(self.window_start)
    }

    /// Events per second, or `None` when nothing was observed or the
    /// window has no positive length.
    pub fn eps(&self) -> Option<f64> {
        let elapsed = self.elapsed().as_secs_f64();
        if self.message_count == 0 || elapsed <= 0.0 {
            None
        } else {
            Some(self.message_count as f64 / elapsed)
        }
    }
}

impl fmt::Display for ThroughputSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ts = self.reported_at.format("%Y-%m-%d %H:%M:%S");
        match self.eps() {
            Some(eps) => write!(f, "[{ts}] Current EPS: {eps:.2}"),
            None => write!(f, "[{ts}] No messages received in the last interval."),
        }
    }
}
