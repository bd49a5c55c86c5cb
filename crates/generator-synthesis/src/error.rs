//! Error types for generator synthesis.

use std::path::PathBuf;

use event_generator::{ContractError, PlanError};

/// Failures of the generation backend.
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error("Generation backend API key is not configured (set GEMINI_API_KEY or --gemini-api-key)")]
    MissingCredential,

    #[error("Generation backend request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Generation backend returned status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Generation backend returned an empty response")]
    EmptyResponse,

    #[error("Synthesized generator is unusable: {0}")]
    Unusable(String),
}

impl From<PlanError> for SynthesisError {
    fn from(err: PlanError) -> Self {
        SynthesisError::Unusable(err.to_string())
    }
}

impl From<ContractError> for SynthesisError {
    fn from(err: ContractError) -> Self {
        SynthesisError::Unusable(err.to_string())
    }
}

/// Failures of the on-disk generator cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Generator cache I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid topic name for a cache key: '{0}'")]
    InvalidTopic(String),

    #[error("Generator artifact already exists at {0}")]
    AlreadyExists(PathBuf),

    #[error("Malformed generator artifact at {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

/// Failures of the resolution pipeline as a whole.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Generated code verification failed. Response: {response}")]
    VerificationRejected { response: String },

    #[error("Cached generator for topic '{topic}' no longer matches the schema ({reason}); rerun with --regenerate-stale")]
    StaleArtifact { topic: String, reason: String },
}
