//! The `monitor` command: report the realized events per second of a topic.

use anyhow::{Context, Result};
use eps_monitor::{AvroConsumer, MonitorArgs, RawConsumer, SampledConsumer, ThroughputMonitor};
use schema_registry::SchemaRegistryClient;
use tokio::sync::broadcast;
use tracing::info;

pub async fn run_monitor(args: MonitorArgs, shutdown: &mut broadcast::Receiver<()>) -> Result<()> {
    info!("Connecting to Kafka broker at {}", args.broker);
    let settings = args.consumer_settings();

    let mut consumer: Box<dyn SampledConsumer> = match (args.avro, &args.schema_registry) {
        (true, Some(url)) => {
            let registry =
                SchemaRegistryClient::new(url).context("Failed to create schema registry client")?;
            Box::new(AvroConsumer::new(&settings, registry).context("Failed to create Avro consumer")?)
        }
        (true, None) => anyhow::bail!("--schema-registry is required when using --avro"),
        (false, _) => Box::new(RawConsumer::new(&settings).context("Failed to create consumer")?),
    };

    info!("Monitoring topic '{}'", args.topic);
    info!(
        "Calculating EPS every {} seconds. Press Ctrl+C to stop",
        args.interval
    );

    let summary = ThroughputMonitor::new(args.interval())
        .run(consumer.as_mut(), shutdown, |sample| println!("{sample}"))
        .await
        .context("Monitor stopped on a fatal consumer error")?;

    info!(
        "Stopping monitor after {} windows ({} messages)",
        summary.windows, summary.messages
    );
    Ok(())
}
