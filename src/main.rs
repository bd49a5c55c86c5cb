//! Command-line interface for eventgen
//!
//! # Usage Examples
//!
//! ## Produce
//! ```bash
//! # Synthesize (first run) or load the cached generator for the topic
//! eventgen produce --topic payments \
//!   --broker localhost:9092 \
//!   --schema-registry http://localhost:8081 \
//!   --eps 50 --add-hotkey
//!
//! # Use the built-in reference generator, no generation backend needed
//! eventgen produce --topic purchases \
//!   --broker localhost:9092 \
//!   --schema-registry http://localhost:8081 \
//!   --builtin PurchaseRequestEventV1
//!
//! # Profile the per-event cost for 10 seconds
//! eventgen produce --topic payments --broker localhost:9092 \
//!   --schema-registry http://localhost:8081 --profile
//! ```
//!
//! ## Monitor
//! ```bash
//! eventgen monitor --topic payments --broker localhost:9092 --interval 5
//! eventgen monitor --topic payments --broker localhost:9092 \
//!   --avro --schema-registry http://localhost:8081
//! ```

use clap::Parser;
use eventgen::{init_tracing, monitor, produce, setup_shutdown_handler, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mut shutdown = setup_shutdown_handler();

    match cli.command {
        Commands::Produce(args) => produce::run_produce(*args, &mut shutdown).await,
        Commands::Monitor(args) => monitor::run_monitor(args, &mut shutdown).await,
    }
}
