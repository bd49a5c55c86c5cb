//! Rate-paced event production to Kafka.
//!
//! A [`ProductionLoop`] ticks once per second. Each tick generates exactly
//! `eps` events, encodes them with an [`EventEncoder`], hands them to an
//! [`EventSink`], then polls the sink for delivery reports before sleeping
//! until the next tick. The loop flushes the sink on every exit path.

pub mod args;
pub mod encoder;
pub mod error;
pub mod production;
pub mod profile;
pub mod sink;

pub use args::{KafkaProducerArgs, LoopArgs, ValueFormat};
pub use encoder::{AvroEncoder, EventEncoder, JsonEncoder};
pub use error::{EncodeError, TransportError};
pub use production::{LoopLimit, LoopState, ProductionLoop, ProductionSummary};
pub use profile::{CallProfiler, ProfileReport, PROFILE_BUDGET};
pub use sink::{DeliveryStats, EventSink, KafkaEventSink, ProducerSettings};
