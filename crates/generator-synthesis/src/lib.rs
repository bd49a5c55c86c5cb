//! Generator synthesis, verification and caching.
//!
//! Resolves the generator for a topic in this order:
//!
//! 1. If `{generator_dir}/{topic}_datagen.yaml` exists, load it and compile it
//!    against the freshly fetched schema. No backend call is made.
//! 2. Otherwise ask the [`Synthesizer`] for a candidate plan, check it against
//!    the schema contract, and ask the [`Verifier`] for a verdict.
//! 3. Only an exact `yes` verdict persists the plan. Anything else aborts with
//!    [`PipelineError::VerificationRejected`].

pub mod args;
pub mod backend;
pub mod cache;
pub mod error;
pub mod gemini;
pub mod pipeline;

pub use args::{GeminiArgs, SynthesisArgs};
pub use backend::{Synthesizer, VerificationResult, Verifier};
pub use cache::{GeneratorArtifact, GeneratorCache};
pub use error::{CacheError, PipelineError, SynthesisError};
pub use gemini::{GeminiClient, GeminiConfig};
pub use pipeline::{ArtifactOrigin, GeneratorPipeline, PipelineOptions, ResolvedGenerator};
