//! Error types for the throughput monitor.

use rdkafka::error::KafkaError;
use schema_registry::RegistryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Kafka error: {0}")]
    Kafka(#[from] KafkaError),

    #[error("Schema registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Consumer reported a fatal error; monitoring stopped")]
    FatalConsumerError,
}

/// Failure to decode one received message.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Message has no payload")]
    EmptyPayload,

    #[error("Payload is not in the schema registry wire format")]
    NotFramed,

    #[error("Failed to resolve writer schema {id}: {source}")]
    Schema {
        id: u32,
        #[source]
        source: RegistryError,
    },

    #[error("Avro decoding error: {0}")]
    Avro(#[from] apache_avro::Error),
}
