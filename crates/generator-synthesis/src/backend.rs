//! Capabilities of the external generation backend.

use async_trait::async_trait;
use schema_registry::SchemaDocument;

use crate::error::SynthesisError;

/// Produces a candidate generator artifact for a schema.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, schema: &SchemaDocument) -> Result<String, SynthesisError>;
}

/// Judges whether a candidate generator conforms to a schema.
#[async_trait]
pub trait Verifier: Send + Sync {
    async fn verify(
        &self,
        candidate: &str,
        schema: &SchemaDocument,
    ) -> Result<VerificationResult, SynthesisError>;
}

/// A verdict from the verification backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub accepted: bool,
    /// The normalized (trimmed, lowercased) response text
    pub raw_response: String,
}

impl VerificationResult {
    /// Normalize a free-text verdict. Only the exact word `yes` is an acceptance.
    pub fn from_response(response: &str) -> Self {
        let raw_response = response.trim().to_lowercase();
        Self {
            accepted: raw_response == "yes",
            raw_response,
        }
    }
}
