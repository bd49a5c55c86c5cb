//! Consumer variants sampled by the throughput monitor.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::time::Duration;

use apache_avro::types::Value as AvroValue;
use apache_avro::Schema;
use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::message::Message;
use schema_registry::{wire, SchemaRegistryClient};

use crate::error::{DecodeError, MonitorError};

/// Wait for the first record of a raw batch.
pub const RAW_POLL_TIMEOUT: Duration = Duration::from_millis(500);

/// Wait for one decoded record.
pub const AVRO_POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// Upper bound on records drained by one raw poll.
pub const RAW_BATCH_MAX: u64 = 500;

const DRAIN_TIMEOUT: Duration = Duration::from_millis(10);

/// Result of one poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollOutcome {
    pub messages: u64,
    pub fatal_error: bool,
}

impl PollOutcome {
    pub fn messages(messages: u64) -> Self {
        Self {
            messages,
            fatal_error: false,
        }
    }

    pub fn fatal() -> Self {
        Self {
            messages: 0,
            fatal_error: true,
        }
    }
}

/// A consumer the throughput monitor can sample.
#[async_trait]
pub trait SampledConsumer: Send {
    /// Bounded wait used for each poll.
    fn poll_timeout(&self) -> Duration;

    /// Poll once, waiting at most about `timeout`, and count what arrived.
    async fn poll_batch(&mut self, timeout: Duration) -> PollOutcome;

    /// Release the consumer. Later polls observe nothing.
    fn close(&mut self);
}

/// Connection settings shared by both variants.
#[derive(Debug, Clone)]
pub struct ConsumerSettings {
    pub brokers: String,
    pub topic: String,
    pub group_id: String,
    pub auto_offset_reset: String,
}

impl ConsumerSettings {
    fn subscribe(&self, partition_eof: bool) -> Result<StreamConsumer, MonitorError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &self.brokers)
            .set("group.id", &self.group_id)
            .set("auto.offset.reset", &self.auto_offset_reset)
            .set("enable.auto.commit", "true")
            .set("enable.partition.eof", partition_eof.to_string())
            .create()?;
        consumer.subscribe(&[&self.topic])?;
        Ok(consumer)
    }
}

/// How the monitor treats a consumer error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Reached the end of a partition; not an error, not a message
    PartitionEof,
    /// The client cannot continue
    Fatal,
    /// Logged and skipped
    Transient,
}

pub fn classify(err: &KafkaError) -> ErrorClass {
    match err {
        KafkaError::PartitionEOF(_) => ErrorClass::PartitionEof,
        e if e.rdkafka_error_code() == Some(RDKafkaErrorCode::Fatal) => ErrorClass::Fatal,
        _ => ErrorClass::Transient,
    }
}

fn outcome_for_error(err: &KafkaError, variant: &str) -> PollOutcome {
    match classify(err) {
        ErrorClass::PartitionEof => PollOutcome::default(),
        ErrorClass::Fatal => {
            tracing::error!("{variant} consumer fatal error: {err}");
            PollOutcome::fatal()
        }
        ErrorClass::Transient => {
            tracing::warn!("{variant} consumer error: {err}");
            PollOutcome::default()
        }
    }
}

/// Counts raw records without decoding them.
pub struct RawConsumer {
    consumer: Option<StreamConsumer>,
}

impl RawConsumer {
    pub fn new(settings: &ConsumerSettings) -> Result<Self, MonitorError> {
        let consumer = settings.subscribe(false)?;
        tracing::info!("Using standard consumer");
        Ok(Self {
            consumer: Some(consumer),
        })
    }
}

#[async_trait]
impl SampledConsumer for RawConsumer {
    fn poll_timeout(&self) -> Duration {
        RAW_POLL_TIMEOUT
    }

    async fn poll_batch(&mut self, timeout: Duration) -> PollOutcome {
        let Some(consumer) = self.consumer.as_ref() else {
            return PollOutcome::default();
        };

        match tokio::time::timeout(timeout, consumer.recv()).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return outcome_for_error(&e, "Standard"),
            Err(_) => return PollOutcome::default(),
        }

        // Drain whatever is already buffered
        let mut outcome = PollOutcome::messages(1);
        while outcome.messages < RAW_BATCH_MAX {
            match tokio::time::timeout(DRAIN_TIMEOUT, consumer.recv()).await {
                Ok(Ok(_)) => outcome.messages += 1,
                Ok(Err(e)) => {
                    outcome.fatal_error = outcome_for_error(&e, "Standard").fatal_error;
                    break;
                }
                Err(_) => break,
            }
        }
        outcome
    }

    fn close(&mut self) {
        if let Some(consumer) = self.consumer.take() {
            consumer.unsubscribe();
            drop(consumer);
            tracing::info!("Consumer closed");
        }
    }
}

/// Decodes Confluent-framed Avro payloads, caching writer schemas by id.
pub struct AvroDecoder {
    registry: SchemaRegistryClient,
    schemas: HashMap<u32, Schema>,
}

impl AvroDecoder {
    pub fn new(registry: SchemaRegistryClient) -> Self {
        Self {
            registry,
            schemas: HashMap::new(),
        }
    }

    pub fn insert_schema(&mut self, id: u32, schema: Schema) {
        self.schemas.insert(id, schema);
    }

    pub async fn decode(&mut self, payload: &[u8]) -> Result<AvroValue, DecodeError> {
        let (id, datum) = wire::unframe(payload).ok_or(DecodeError::NotFramed)?;

        let schema = match self.schemas.entry(id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let document = self
                    .registry
                    .fetch_by_id(id)
                    .await
                    .map_err(|source| DecodeError::Schema { id, source })?;
                tracing::debug!("Cached writer schema {id}");
                entry.insert(document.schema().clone())
            }
        };

        Ok(apache_avro::from_avro_datum(schema, &mut &datum[..], None)?)
    }
}

/// Counts records that decode against their registered writer schema.
pub struct AvroConsumer {
    consumer: Option<StreamConsumer>,
    decoder: AvroDecoder,
}

impl AvroConsumer {
    pub fn new(
        settings: &ConsumerSettings,
        registry: SchemaRegistryClient,
    ) -> Result<Self, MonitorError> {
        let consumer = settings.subscribe(true)?;
        tracing::info!("Using Avro consumer (schema registry: {})", registry.base_url());
        Ok(Self {
            consumer: Some(consumer),
            decoder: AvroDecoder::new(registry),
        })
    }
}

#[async_trait]
impl SampledConsumer for AvroConsumer {
    fn poll_timeout(&self) -> Duration {
        AVRO_POLL_TIMEOUT
    }

    async fn poll_batch(&mut self, timeout: Duration) -> PollOutcome {
        let Some(consumer) = self.consumer.as_ref() else {
            return PollOutcome::default();
        };

        let payload = match tokio::time::timeout(timeout, consumer.recv()).await {
            Ok(Ok(message)) => message.payload().map(<[u8]>::to_vec),
            Ok(Err(e)) => return outcome_for_error(&e, "Avro"),
            Err(_) => return PollOutcome::default(),
        };

        let Some(payload) = payload else {
            tracing::warn!("AvroConsumer error: {}", DecodeError::EmptyPayload);
            return PollOutcome::default();
        };

        match self.decoder.decode(&payload).await {
            Ok(_) => PollOutcome::messages(1),
            Err(e) => {
                tracing::warn!("AvroConsumer error: {e}");
                PollOutcome::default()
            }
        }
    }

    fn close(&mut self) {
        if let Some(consumer) = self.consumer.take() {
            consumer.unsubscribe();
            drop(consumer);
            tracing::info!("Consumer closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apache_avro::types::Record;

    const SCHEMA: &str = r#"{"type": "record", "name": "Ping", "fields": [
        {"name": "Id", "type": "string"},
        {"name": "Count", "type": "long"}
    ]}"#;

    fn unreachable_registry() -> SchemaRegistryClient {
        // Port 1 is never served in the test environment
        SchemaRegistryClient::new("http://127.0.0.1:1").unwrap()
    }

    fn datum(schema: &Schema) -> Vec<u8> {
        let mut record = Record::new(schema).unwrap();
        record.put("Id", "p-1");
        record.put("Count", 3i64);
        apache_avro::to_avro_datum(schema, record).unwrap()
    }

    #[test]
    fn test_classify_errors() {
        assert_eq!(classify(&KafkaError::PartitionEOF(3)), ErrorClass::PartitionEof);
        assert_eq!(
            classify(&KafkaError::MessageConsumption(RDKafkaErrorCode::Fatal)),
            ErrorClass::Fatal
        );
        assert_eq!(
            classify(&KafkaError::MessageConsumption(RDKafkaErrorCode::BrokerTransportFailure)),
            ErrorClass::Transient
        );
    }

    #[test]
    fn test_error_outcomes() {
        assert_eq!(
            outcome_for_error(&KafkaError::PartitionEOF(0), "t"),
            PollOutcome::default()
        );
        assert!(
            outcome_for_error(&KafkaError::MessageConsumption(RDKafkaErrorCode::Fatal), "t")
                .fatal_error
        );
        assert_eq!(
            outcome_for_error(
                &KafkaError::MessageConsumption(RDKafkaErrorCode::UnknownTopicOrPartition),
                "t"
            ),
            PollOutcome::default()
        );
    }

    #[tokio::test]
    async fn test_decode_with_cached_schema() {
        let schema = Schema::parse_str(SCHEMA).unwrap();
        let mut decoder = AvroDecoder::new(unreachable_registry());
        decoder.insert_schema(5, schema.clone());

        let value = decoder.decode(&wire::frame(5, &datum(&schema))).await.unwrap();
        let AvroValue::Record(fields) = value else {
            panic!("Expected record");
        };
        assert_eq!(fields[0].1, AvroValue::String("p-1".to_string()));
    }

    #[tokio::test]
    async fn test_decode_rejects_unframed_payload() {
        let mut decoder = AvroDecoder::new(unreachable_registry());
        let result = decoder.decode(br#"{"Id": "p-1"}"#).await;
        assert!(matches!(result, Err(DecodeError::NotFramed)));
    }

    #[tokio::test]
    async fn test_decode_unknown_schema_id() {
        let mut decoder = AvroDecoder::new(unreachable_registry());
        let result = decoder.decode(&wire::frame(99, &[2, 0])).await;
        assert!(matches!(result, Err(DecodeError::Schema { id: 99, .. })));
    }

    #[tokio::test]
    async fn test_decode_truncated_datum() {
        let schema = Schema::parse_str(SCHEMA).unwrap();
        let mut decoder = AvroDecoder::new(unreachable_registry());
        decoder.insert_schema(5, schema);

        let result = decoder.decode(&wire::frame(5, &[])).await;
        assert!(matches!(result, Err(DecodeError::Avro(_))));
    }
}
