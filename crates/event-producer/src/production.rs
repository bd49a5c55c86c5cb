//! The rate-paced production loop.

use std::time::Duration;

use event_generator::EventGenerator;
use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::encoder::EventEncoder;
use crate::error::TransportError;
use crate::profile::{CallProfiler, ProfileReport};
use crate::sink::{DeliveryStats, EventSink};

/// Length of one production tick.
pub const TICK: Duration = Duration::from_secs(1);

/// Lifecycle of a [`ProductionLoop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Stopped,
    Fatal,
}

/// When a run ends on its own, without an interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopLimit {
    Unbounded,
    Ticks(u64),
    Duration(Duration),
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductionSummary {
    pub events_sent: u64,
    pub ticks: u64,
    pub elapsed: Duration,
    pub deliveries: DeliveryStats,
}

impl ProductionSummary {
    /// Achieved send rate over the whole run.
    pub fn events_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.events_sent as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }

    pub fn log(&self) {
        tracing::info!(
            "Sent {} events in {} ticks over {:.1}s ({:.1} events/sec); delivered: {}, failed: {}",
            self.events_sent,
            self.ticks,
            self.elapsed.as_secs_f64(),
            self.events_per_second(),
            self.deliveries.delivered,
            self.deliveries.failed
        );
    }
}

/// Generates, encodes and sends `eps` events per one-second tick.
///
/// Every exit path flushes the sink exactly once before returning, so no
/// enqueued event is dropped on interrupt or on a fatal error.
pub struct ProductionLoop<S: EventSink> {
    generator: Box<dyn EventGenerator>,
    encoder: Box<dyn EventEncoder>,
    sink: S,
    eps: u32,
    add_hotkey: bool,
    flush_timeout: Duration,
    profiler: Option<CallProfiler>,
    state: LoopState,
}

impl<S: EventSink> ProductionLoop<S> {
    pub fn new(
        generator: Box<dyn EventGenerator>,
        encoder: Box<dyn EventEncoder>,
        sink: S,
        eps: u32,
    ) -> Self {
        Self {
            generator,
            encoder,
            sink,
            eps,
            add_hotkey: false,
            flush_timeout: Duration::from_secs(30),
            profiler: None,
            state: LoopState::Idle,
        }
    }

    pub fn with_hotkey(mut self, add_hotkey: bool) -> Self {
        self.add_hotkey = add_hotkey;
        self
    }

    pub fn with_flush_timeout(mut self, timeout: Duration) -> Self {
        self.flush_timeout = timeout;
        self
    }

    /// Record per-call timings during the run.
    pub fn with_profiling(mut self) -> Self {
        self.profiler = Some(CallProfiler::new());
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn profile_report(&self) -> Option<ProfileReport> {
        self.profiler.as_ref().map(CallProfiler::report)
    }

    /// Run until interrupted, a fatal error, or `limit`.
    pub async fn run(
        &mut self,
        shutdown: &mut broadcast::Receiver<()>,
        limit: LoopLimit,
    ) -> Result<ProductionSummary, TransportError> {
        self.state = LoopState::Running;
        tracing::info!(
            "Streaming events with a target of {} events/sec (generator: {}, hotkey: {})",
            self.eps,
            self.generator.name(),
            self.add_hotkey
        );

        let started = Instant::now();
        let mut ticks = 0u64;
        let mut events_sent = 0u64;

        let outcome = loop {
            let reached = match limit {
                LoopLimit::Unbounded => false,
                LoopLimit::Ticks(n) => ticks >= n,
                LoopLimit::Duration(budget) => started.elapsed() >= budget,
            };
            if reached {
                tracing::debug!("Production limit reached after {ticks} ticks");
                break Ok(());
            }

            let tick_start = Instant::now();
            match self.tick() {
                Ok(sent) => events_sent += sent,
                Err(e) => break Err(e),
            }
            self.poll_sink();
            ticks += 1;

            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Stopping producer");
                    break Ok(());
                }
                _ = tokio::time::sleep_until(tick_start + TICK) => {}
            }
        };

        let flushed = self.sink.flush(self.flush_timeout);
        let summary = ProductionSummary {
            events_sent,
            ticks,
            elapsed: started.elapsed(),
            deliveries: self.sink.delivery_stats(),
        };

        match (outcome, flushed) {
            (Ok(()), Ok(())) => {
                self.state = LoopState::Stopped;
                summary.log();
                Ok(summary)
            }
            (Ok(()), Err(e)) => {
                self.state = LoopState::Fatal;
                Err(e)
            }
            (Err(e), flushed) => {
                self.state = LoopState::Fatal;
                if let Err(flush_err) = flushed {
                    tracing::error!("Flush after fatal error also failed: {flush_err}");
                }
                tracing::error!("Production aborted after {events_sent} events: {e}");
                Err(e)
            }
        }
    }

    /// Generate and send exactly `eps` events.
    fn tick(&mut self) -> Result<u64, TransportError> {
        for _ in 0..self.eps {
            let add_hotkey = self.add_hotkey;
            let generator = &mut self.generator;
            let encoder = &self.encoder;
            let sink = &mut self.sink;

            match self.profiler.as_mut() {
                Some(profiler) => {
                    let event = profiler.time("generate", || generator.generate(add_hotkey));
                    let payload = profiler.time("encode", || encoder.encode(&event))?;
                    profiler.time("send", || sink.send(&payload))?;
                }
                None => {
                    let event = generator.generate(add_hotkey);
                    let payload = encoder.encode(&event)?;
                    sink.send(&payload)?;
                }
            }
        }
        Ok(u64::from(self.eps))
    }

    fn poll_sink(&mut self) {
        match self.profiler.as_mut() {
            Some(profiler) => profiler.time("poll", || self.sink.poll()),
            None => self.sink.poll(),
        }
    }
}
