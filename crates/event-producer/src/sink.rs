//! Transport client for the production loop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::producer::{BaseProducer, BaseRecord, DeliveryResult, Producer, ProducerContext};
use rdkafka::{ClientConfig, ClientContext};

use crate::error::TransportError;

/// Attempts made while the local producer queue is full.
pub const QUEUE_FULL_ATTEMPTS: u32 = 10;

/// Poll interval between queue-full attempts.
pub const QUEUE_FULL_BACKOFF: Duration = Duration::from_millis(100);

/// Delivery outcomes reported by the transport so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    pub delivered: u64,
    pub failed: u64,
}

/// Send/poll/flush interface to the messaging backend.
pub trait EventSink {
    /// Enqueue one payload. An error is fatal for the run.
    fn send(&mut self, payload: &[u8]) -> Result<(), TransportError>;

    /// Drive delivery callbacks without blocking.
    fn poll(&mut self);

    /// Block until every enqueued payload is delivered or `timeout` elapses.
    fn flush(&mut self, timeout: Duration) -> Result<(), TransportError>;

    fn delivery_stats(&self) -> DeliveryStats {
        DeliveryStats::default()
    }
}

/// Producer tuning passed through to the Kafka client.
#[derive(Debug, Clone)]
pub struct ProducerSettings {
    pub brokers: String,
    pub linger_ms: u64,
    pub batch_size: u64,
    pub compression: String,
    pub acks: String,
    /// Extra `key=value` client properties, applied last
    pub properties: Vec<(String, String)>,
}

impl Default for ProducerSettings {
    fn default() -> Self {
        Self {
            brokers: "localhost:9092".to_string(),
            linger_ms: 100,
            batch_size: 1024 * 1024,
            compression: "snappy".to_string(),
            acks: "1".to_string(),
            properties: Vec::new(),
        }
    }
}

impl ProducerSettings {
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", &self.brokers)
            .set("linger.ms", self.linger_ms.to_string())
            .set("batch.size", self.batch_size.to_string())
            .set("compression.type", &self.compression)
            .set("acks", &self.acks);
        for (key, value) in &self.properties {
            config.set(key, value);
        }
        config
    }
}

#[derive(Debug, Default)]
struct DeliveryCounters {
    delivered: AtomicU64,
    failed: AtomicU64,
}

/// Counts delivery reports as the producer polls them.
struct DeliveryContext {
    counters: Arc<DeliveryCounters>,
}

impl ClientContext for DeliveryContext {}

impl ProducerContext for DeliveryContext {
    type DeliveryOpaque = ();

    fn delivery(&self, result: &DeliveryResult<'_>, _opaque: Self::DeliveryOpaque) {
        match result {
            Ok(_) => {
                self.counters.delivered.fetch_add(1, Ordering::Relaxed);
            }
            Err((e, _)) => {
                let failed = self.counters.failed.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::error!("Message delivery failed ({failed} so far): {e}");
            }
        }
    }
}

/// Kafka producer writing every payload to one topic.
pub struct KafkaEventSink {
    producer: BaseProducer<DeliveryContext>,
    topic: String,
    counters: Arc<DeliveryCounters>,
}

impl KafkaEventSink {
    pub fn new(settings: &ProducerSettings, topic: &str) -> Result<Self, TransportError> {
        let counters = Arc::new(DeliveryCounters::default());
        let producer: BaseProducer<DeliveryContext> = settings
            .client_config()
            .create_with_context(DeliveryContext {
                counters: counters.clone(),
            })?;

        tracing::info!(
            "Created Kafka producer for topic '{}' (brokers: {}, linger.ms: {}, batch.size: {}, compression: {}, acks: {})",
            topic,
            settings.brokers,
            settings.linger_ms,
            settings.batch_size,
            settings.compression,
            settings.acks
        );

        Ok(Self {
            producer,
            topic: topic.to_string(),
            counters,
        })
    }
}

impl EventSink for KafkaEventSink {
    fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        let mut record = BaseRecord::<(), [u8]>::to(&self.topic).payload(payload);

        for attempt in 1..=QUEUE_FULL_ATTEMPTS {
            match self.producer.send(record) {
                Ok(()) => return Ok(()),
                Err((KafkaError::MessageProduction(RDKafkaErrorCode::QueueFull), returned)) => {
                    tracing::debug!(
                        "Producer queue full (attempt {attempt}/{QUEUE_FULL_ATTEMPTS}), polling"
                    );
                    self.producer.poll(QUEUE_FULL_BACKOFF);
                    record = returned;
                }
                Err((e, _)) => return Err(TransportError::Kafka(e)),
            }
        }

        Err(TransportError::QueueFull {
            attempts: QUEUE_FULL_ATTEMPTS,
        })
    }

    fn poll(&mut self) {
        self.producer.poll(Duration::ZERO);
    }

    fn flush(&mut self, timeout: Duration) -> Result<(), TransportError> {
        tracing::info!(
            "Flushing {} in-flight messages",
            self.producer.in_flight_count()
        );
        match self.producer.flush(timeout) {
            Ok(()) => Ok(()),
            Err(KafkaError::Flush(_)) => Err(TransportError::FlushIncomplete {
                in_flight: self.producer.in_flight_count(),
            }),
            Err(e) => Err(TransportError::Kafka(e)),
        }
    }

    fn delivery_stats(&self) -> DeliveryStats {
        DeliveryStats {
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_match_documented_defaults() {
        let settings = ProducerSettings::default();
        let config = settings.client_config();
        assert_eq!(config.get("linger.ms"), Some("100"));
        assert_eq!(config.get("batch.size"), Some("1048576"));
        assert_eq!(config.get("compression.type"), Some("snappy"));
        assert_eq!(config.get("acks"), Some("1"));
    }

    #[test]
    fn test_properties_override_settings() {
        let settings = ProducerSettings {
            brokers: "broker:9092".to_string(),
            properties: vec![
                ("acks".to_string(), "all".to_string()),
                ("client.id".to_string(), "eventgen".to_string()),
            ],
            ..Default::default()
        };
        let config = settings.client_config();
        assert_eq!(config.get("bootstrap.servers"), Some("broker:9092"));
        assert_eq!(config.get("acks"), Some("all"));
        assert_eq!(config.get("client.id"), Some("eventgen"));
    }

    #[test]
    fn test_sink_creation_does_not_connect() {
        // librdkafka connects lazily, so an unreachable broker is fine here
        let settings = ProducerSettings {
            brokers: "127.0.0.1:1".to_string(),
            ..Default::default()
        };
        let sink = KafkaEventSink::new(&settings, "t").unwrap();
        assert_eq!(sink.delivery_stats(), DeliveryStats::default());
    }
}
