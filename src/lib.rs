//! eventgen
//!
//! Streams schema-conformant synthetic events to a Kafka topic at a target
//! rate, and measures the realized throughput of a topic.
//!
//! # Components
//!
//! - `event_generator` - the `EventGenerator` capability, built-in generators
//!   and declarative generator plans
//! - `schema_registry` - schema fetches and the registry wire format
//! - `generator_synthesis` - synthesis, verification and caching of plans
//! - `event_producer` - the rate-paced production loop
//! - `eps_monitor` - the throughput monitor
//!
//! # CLI Usage
//!
//! ```bash
//! # Produce 100 events/sec, synthesizing a generator on first use
//! eventgen produce --topic payments --broker localhost:9092 \
//!   --schema-registry http://localhost:8081 --eps 100
//!
//! # Measure throughput, decoding Avro payloads
//! eventgen monitor --topic payments --broker localhost:9092 \
//!   --avro --schema-registry http://localhost:8081
//! ```

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod cli;
pub mod monitor;
pub mod produce;

pub use cli::{Cli, Commands};

/// Log filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "eventgen=info,event_producer=info,eps_monitor=info,generator_synthesis=info,schema_registry=info,event_generator=info";

pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Sets up a shutdown signal handler
pub fn setup_shutdown_handler() -> tokio::sync::broadcast::Receiver<()> {
    let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);

    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");

        info!("Received interrupt signal (Ctrl+C)");
        let _ = shutdown_tx.send(());
    });

    shutdown_rx
}
