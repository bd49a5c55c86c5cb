//! The `produce` command: resolve a generator for a topic and stream events.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::builder::PossibleValuesParser;
use clap::Args;
use event_generator::{builtin_generator, builtin_schema, EventGenerator, BUILTIN_GENERATORS};
use event_producer::{
    AvroEncoder, EventEncoder, JsonEncoder, KafkaEventSink, KafkaProducerArgs, LoopArgs,
    LoopLimit, ProductionLoop, ValueFormat, PROFILE_BUDGET,
};
use generator_synthesis::{GeminiClient, GeneratorCache, GeneratorPipeline, SynthesisArgs};
use schema_registry::{SchemaDocument, SchemaRegistryClient};
use tokio::sync::broadcast;
use tracing::{info, warn};

#[derive(Args, Clone, Debug)]
pub struct ProduceArgs {
    /// Kafka topic to produce to
    #[arg(long)]
    pub topic: String,

    /// Schema Registry URL
    #[arg(long, env = "SCHEMA_REGISTRY_URL")]
    pub schema_registry: String,

    /// Use a built-in generator instead of a synthesized one
    #[arg(long, value_parser = PossibleValuesParser::new(BUILTIN_GENERATORS.iter().copied()))]
    pub builtin: Option<String>,

    /// Seed for the generator's random number generator
    #[arg(long)]
    pub seed: Option<u64>,

    #[command(flatten)]
    pub kafka: KafkaProducerArgs,

    #[command(flatten)]
    pub production: LoopArgs,

    #[command(flatten)]
    pub synthesis: SynthesisArgs,
}

pub async fn run_produce(args: ProduceArgs, shutdown: &mut broadcast::Receiver<()>) -> Result<()> {
    let registry = SchemaRegistryClient::new(&args.schema_registry)
        .context("Failed to create schema registry client")?;
    let schema = registry
        .fetch_topic_value_schema(&args.topic)
        .await
        .with_context(|| format!("Failed to fetch value schema for topic '{}'", args.topic))?;
    info!(
        "Fetched schema '{}' (id {:?}, version {:?})",
        schema.subject(),
        schema.id(),
        schema.version()
    );

    let generator = match &args.builtin {
        Some(name) => resolve_builtin(name, args.seed, &schema)?,
        None => {
            let backend = Arc::new(
                GeminiClient::new(args.synthesis.gemini.to_config())
                    .context("Failed to create generation backend client")?,
            );
            let cache = GeneratorCache::open(&args.synthesis.generator_dir)
                .context("Failed to open generator directory")?;
            let pipeline = GeneratorPipeline::new(
                cache,
                backend.clone(),
                backend,
                args.synthesis.pipeline_options(args.seed),
            );
            let resolved = pipeline
                .resolve(&args.topic, &schema)
                .await
                .with_context(|| format!("Failed to resolve generator for topic '{}'", args.topic))?;
            Box::new(resolved.generator)
        }
    };

    let encoder = build_encoder(args.production.value_format, &schema)?;
    let sink = KafkaEventSink::new(&args.kafka.to_settings(), &args.topic)
        .context("Failed to create Kafka producer")?;

    let mut production = ProductionLoop::new(generator, encoder, sink, args.production.eps)
        .with_hotkey(args.production.add_hotkey)
        .with_flush_timeout(args.production.flush_timeout());

    let limit = if args.production.profile {
        info!("Profiling for {} seconds", PROFILE_BUDGET.as_secs());
        production = production.with_profiling();
        LoopLimit::Duration(PROFILE_BUDGET)
    } else {
        LoopLimit::Unbounded
    };

    let result = production.run(shutdown, limit).await;

    if let Some(report) = production.profile_report() {
        println!("{report}");
    }

    let summary = result.context("Production loop failed")?;
    summary.log();
    Ok(())
}

/// Look up a built-in generator, warning when its schema differs from the registry's.
pub fn resolve_builtin(
    name: &str,
    seed: Option<u64>,
    schema: &SchemaDocument,
) -> Result<Box<dyn EventGenerator>> {
    let generator = builtin_generator(name, seed)
        .with_context(|| format!("Unknown built-in generator '{name}'"))?;

    if let Some(text) = builtin_schema(name) {
        let expected = SchemaDocument::new(name, text, None, None)
            .with_context(|| format!("Built-in schema for '{name}' is invalid"))?;
        if expected.fingerprint() != schema.fingerprint() {
            warn!(
                "Built-in generator '{name}' was written for a different schema than '{}'; encoding may fail",
                schema.subject()
            );
        }
    }

    info!("Using built-in generator '{name}'");
    Ok(generator)
}

pub fn build_encoder(format: ValueFormat, schema: &SchemaDocument) -> Result<Box<dyn EventEncoder>> {
    Ok(match format {
        ValueFormat::Avro => Box::new(
            AvroEncoder::new(schema).context("Cannot encode Avro without a registry schema id")?,
        ),
        ValueFormat::Json => Box::new(JsonEncoder),
    })
}
