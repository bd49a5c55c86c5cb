//! CLI argument definitions for generator synthesis.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use crate::gemini::{GeminiConfig, DEFAULT_GEMINI_ENDPOINT, DEFAULT_GEMINI_MODEL};
use crate::pipeline::PipelineOptions;

/// Generation backend arguments.
#[derive(Args, Clone, Debug)]
pub struct GeminiArgs {
    /// API key for the generation backend
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// Model used for synthesis and verification
    #[arg(long, default_value = DEFAULT_GEMINI_MODEL)]
    pub gemini_model: String,

    /// Base URL of the generation API
    #[arg(long, default_value = DEFAULT_GEMINI_ENDPOINT)]
    pub gemini_endpoint: String,

    /// Timeout for a single backend request, in seconds
    #[arg(long, default_value = "300")]
    pub gemini_timeout_secs: u64,
}

impl GeminiArgs {
    pub fn to_config(&self) -> GeminiConfig {
        GeminiConfig {
            api_key: self.gemini_api_key.clone(),
            model: self.gemini_model.clone(),
            endpoint: self.gemini_endpoint.clone(),
            timeout: Duration::from_secs(self.gemini_timeout_secs),
        }
    }
}

/// Generator resolution arguments.
#[derive(Args, Clone, Debug)]
pub struct SynthesisArgs {
    /// Directory holding accepted generator artifacts
    #[arg(long, default_value = "generated_functions")]
    pub generator_dir: PathBuf,

    /// Delete and resynthesize a cached generator whose schema changed
    #[arg(long)]
    pub regenerate_stale: bool,

    #[command(flatten)]
    pub gemini: GeminiArgs,
}

impl SynthesisArgs {
    pub fn pipeline_options(&self, seed: Option<u64>) -> PipelineOptions {
        PipelineOptions {
            regenerate_stale: self.regenerate_stale,
            seed,
        }
    }
}
