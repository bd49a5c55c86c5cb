//! The throughput sampling loop.

use std::ops::{Deref, DerefMut};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::consumer::SampledConsumer;
use crate::error::MonitorError;
use crate::sample::ThroughputSample;

/// Totals over a monitoring run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorSummary {
    pub windows: u64,
    pub messages: u64,
}

/// Closes the consumer when dropped, whichever way the loop exits.
struct CloseOnDrop<'a, C: SampledConsumer + ?Sized>(&'a mut C);

impl<C: SampledConsumer + ?Sized> Deref for CloseOnDrop<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        self.0
    }
}

impl<C: SampledConsumer + ?Sized> DerefMut for CloseOnDrop<'_, C> {
    fn deref_mut(&mut self) -> &mut C {
        self.0
    }
}

impl<C: SampledConsumer + ?Sized> Drop for CloseOnDrop<'_, C> {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Samples a consumer over fixed windows and reports events per second.
///
/// A window closes once the time spent polling reaches `interval`; its
/// actual length is measured, so a poll that overruns the interval is
/// accounted for.
#[derive(Debug, Clone)]
pub struct ThroughputMonitor {
    interval: Duration,
    max_windows: Option<u64>,
}

impl ThroughputMonitor {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_windows: None,
        }
    }

    /// Stop after this many windows instead of running until interrupted.
    pub fn with_max_windows(mut self, windows: u64) -> Self {
        self.max_windows = Some(windows);
        self
    }

    /// Run until interrupted, a fatal consumer error, or the window limit.
    ///
    /// The consumer is closed exactly once before this returns.
    pub async fn run<C, F>(
        &self,
        consumer: &mut C,
        shutdown: &mut broadcast::Receiver<()>,
        mut on_sample: F,
    ) -> Result<MonitorSummary, MonitorError>
    where
        C: SampledConsumer + ?Sized,
        F: FnMut(&ThroughputSample),
    {
        let mut consumer = CloseOnDrop(consumer);
        let mut summary = MonitorSummary::default();
        let poll_timeout = consumer.poll_timeout();

        tracing::info!(
            "Calculating EPS every {} seconds. Press Ctrl+C to stop.",
            self.interval.as_secs_f64()
        );

        'windows: loop {
            if self.max_windows.is_some_and(|max| summary.windows >= max) {
                break;
            }

            let window_start = Instant::now();
            let mut count = 0u64;

            while window_start.elapsed() < self.interval {
                let outcome = tokio::select! {
                    _ = shutdown.recv() => {
                        tracing::info!("Stopping monitor");
                        break 'windows;
                    }
                    outcome = consumer.poll_batch(poll_timeout) => outcome,
                };

                count += outcome.messages;
                if outcome.fatal_error {
                    return Err(MonitorError::FatalConsumerError);
                }
            }

            let sample = ThroughputSample::new(window_start, Instant::now(), count);
            tracing::debug!(
                "Window closed: {} messages in {:.3}s",
                sample.message_count,
                sample.elapsed().as_secs_f64()
            );
            on_sample(&sample);

            summary.windows += 1;
            summary.messages += count;
        }

        Ok(summary)
    }
}
