//! CLI argument definitions for the producer.

use std::time::Duration;

use clap::{Args, ValueEnum};

use crate::sink::ProducerSettings;

/// Kafka producer connection and tuning.
#[derive(Args, Clone, Debug)]
pub struct KafkaProducerArgs {
    /// Kafka broker address (comma-separated for several)
    #[arg(long, env = "KAFKA_BROKERS")]
    pub broker: String,

    /// Producer batching delay in milliseconds
    #[arg(long, default_value = "100")]
    pub linger_ms: u64,

    /// Maximum producer batch size in bytes
    #[arg(long, default_value = "1048576")]
    pub batch_size: u64,

    /// Compression codec (none, gzip, snappy, lz4, zstd)
    #[arg(long, default_value = "snappy")]
    pub compression: String,

    /// Acknowledgment level (0, 1, all)
    #[arg(long, default_value = "1")]
    pub acks: String,

    /// Extra client property as key=value (repeatable)
    #[arg(long = "producer-property", value_parser = parse_key_val)]
    pub producer_properties: Vec<(String, String)>,
}

impl KafkaProducerArgs {
    pub fn to_settings(&self) -> ProducerSettings {
        ProducerSettings {
            brokers: self.broker.clone(),
            linger_ms: self.linger_ms,
            batch_size: self.batch_size,
            compression: self.compression.clone(),
            acks: self.acks.clone(),
            properties: self.producer_properties.clone(),
        }
    }
}

/// Wire format of produced message values.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ValueFormat {
    /// Confluent-framed Avro against the registry schema
    #[default]
    Avro,
    /// Plain JSON objects
    Json,
}

/// Production loop options.
#[derive(Args, Clone, Debug)]
pub struct LoopArgs {
    /// Target events per second
    #[arg(long, default_value = "10")]
    pub eps: u32,

    /// Run for 10 seconds and print a per-call timing report
    #[arg(long)]
    pub profile: bool,

    /// Add a random 'hotkeyId' in [1, 50] to each event to spread downstream partition keys
    #[arg(long)]
    pub add_hotkey: bool,

    /// Message value format
    #[arg(long, value_enum, default_value_t = ValueFormat::Avro)]
    pub value_format: ValueFormat,

    /// Seconds to wait for outstanding deliveries on shutdown
    #[arg(long, default_value = "30")]
    pub flush_timeout_secs: u64,
}

impl LoopArgs {
    pub fn flush_timeout(&self) -> Duration {
        Duration::from_secs(self.flush_timeout_secs)
    }
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid key=value: no '=' found in '{s}'"))?;
    if key.is_empty() {
        return Err(format!("invalid key=value: empty key in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
