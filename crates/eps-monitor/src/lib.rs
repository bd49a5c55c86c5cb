//! Throughput monitor for a Kafka topic.
//!
//! The [`ThroughputMonitor`] loop is written once against the
//! [`SampledConsumer`] capability, which has two variants:
//!
//! - [`RawConsumer`] counts raw records, draining a batch per poll.
//! - [`AvroConsumer`] decodes one record per poll and counts only records
//!   that decode against their registered writer schema.

pub mod args;
pub mod consumer;
pub mod error;
pub mod monitor;
pub mod sample;

pub use args::MonitorArgs;
pub use consumer::{
    AvroConsumer, AvroDecoder, ConsumerSettings, PollOutcome, RawConsumer, SampledConsumer,
};
pub use error::{DecodeError, MonitorError};
pub use monitor::{MonitorSummary, ThroughputMonitor};
pub use sample::ThroughputSample;
