//! Command-line interface definition.

use clap::{Parser, Subcommand};
use eps_monitor::MonitorArgs;

use crate::produce::ProduceArgs;

#[derive(Parser, Debug)]
#[command(name = "eventgen")]
#[command(about = "Schema-driven synthetic event producer and Kafka throughput monitor")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stream generated events to a topic at a target rate
    Produce(Box<ProduceArgs>),

    /// Report the events per second arriving on a topic
    Monitor(MonitorArgs),
}
