//! CLI argument definitions for the throughput monitor.

use std::time::Duration;

use clap::Args;

use crate::consumer::ConsumerSettings;

#[derive(Args, Clone, Debug)]
pub struct MonitorArgs {
    /// Kafka topic to monitor
    #[arg(long)]
    pub topic: String,

    /// Kafka broker address
    #[arg(long, env = "KAFKA_BROKERS")]
    pub broker: String,

    /// Interval in seconds to calculate and report EPS
    #[arg(long, default_value = "5", value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: u64,

    /// Decode messages as schema registry framed Avro instead of counting raw records
    #[arg(long, requires = "schema_registry")]
    pub avro: bool,

    /// Schema Registry URL (required for --avro)
    #[arg(long)]
    pub schema_registry: Option<String>,

    /// Consumer group id
    #[arg(long, default_value = "eps-monitor-group")]
    pub group_id: String,

    /// Where to start when the group has no committed offset
    #[arg(long, default_value = "latest", value_parser = ["earliest", "latest"])]
    pub auto_offset_reset: String,
}

impl MonitorArgs {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    pub fn consumer_settings(&self) -> ConsumerSettings {
        ConsumerSettings {
            brokers: self.broker.clone(),
            topic: self.topic.clone(),
            group_id: self.group_id.clone(),
            auto_offset_reset: self.auto_offset_reset.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        monitor: MonitorArgs,
    }

    #[test]
    fn test_defaults() {
        let cli = TestCli::parse_from(["test", "--topic", "t", "--broker", "b:9092"]);
        assert_eq!(cli.monitor.interval(), Duration::from_secs(5));
        assert!(!cli.monitor.avro);

        let settings = cli.monitor.consumer_settings();
        assert_eq!(settings.topic, "t");
        assert_eq!(settings.group_id, "eps-monitor-group");
        assert_eq!(settings.auto_offset_reset, "latest");
    }

    #[test]
    fn test_avro_requires_schema_registry() {
        let result = TestCli::try_parse_from(["test", "--topic", "t", "--broker", "b", "--avro"]);
        assert!(result.is_err());

        let cli = TestCli::parse_from([
            "test",
            "--topic",
            "t",
            "--broker",
            "b",
            "--avro",
            "--schema-registry",
            "http://registry:8081",
        ]);
        assert!(cli.monitor.avro);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let result =
            TestCli::try_parse_from(["test", "--topic", "t", "--broker", "b", "--interval", "0"]);
        assert!(result.is_err());
    }
}
