//! Error types for event production.

use rdkafka::error::KafkaError;
use thiserror::Error;

/// Failure to turn an event into a message payload.
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("Schema document '{0}' has no registry id to frame messages with")]
    MissingSchemaId(String),

    #[error("Field '{path}': {reason}")]
    Incompatible { path: String, reason: String },

    #[error("Avro encoding error: {0}")]
    Avro(#[from] apache_avro::Error),

    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors at the messaging layer.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Kafka error: {0}")]
    Kafka(#[from] KafkaError),

    #[error("Failed to encode event: {0}")]
    Encode(#[from] EncodeError),

    #[error("Producer queue still full after {attempts} attempts")]
    QueueFull { attempts: u32 },

    #[error("Flush timed out with {in_flight} messages still in flight")]
    FlushIncomplete { in_flight: i32 },
}
