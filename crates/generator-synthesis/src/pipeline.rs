//! Resolution of a topic's generator: cache first, then synthesis.

use std::sync::Arc;

use event_generator::{GeneratorPlan, PlanGenerator};
use schema_registry::SchemaDocument;

use crate::backend::{Synthesizer, Verifier};
use crate::cache::{GeneratorArtifact, GeneratorCache};
use crate::error::{CacheError, PipelineError, SynthesisError};

/// Where a resolved generator came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactOrigin {
    Cached,
    Synthesized,
}

/// Options for [`GeneratorPipeline`].
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Delete and resynthesize artifacts that no longer match the schema
    pub regenerate_stale: bool,
    /// Seed for the compiled generator's RNG
    pub seed: Option<u64>,
}

/// A generator ready to run.
pub struct ResolvedGenerator {
    pub generator: PlanGenerator,
    pub origin: ArtifactOrigin,
}

/// Turns a schema into a verified, cached generator.
///
/// A cached artifact short-circuits synthesis and verification entirely, so
/// the backend is consulted at most once per topic for the lifetime of the
/// cache directory. Nothing is persisted unless the verifier accepts.
pub struct GeneratorPipeline {
    cache: GeneratorCache,
    synthesizer: Arc<dyn Synthesizer>,
    verifier: Arc<dyn Verifier>,
    options: PipelineOptions,
}

impl GeneratorPipeline {
    pub fn new(
        cache: GeneratorCache,
        synthesizer: Arc<dyn Synthesizer>,
        verifier: Arc<dyn Verifier>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            cache,
            synthesizer,
            verifier,
            options,
        }
    }

    pub fn cache(&self) -> &GeneratorCache {
        &self.cache
    }

    pub async fn resolve(
        &self,
        topic: &str,
        schema: &SchemaDocument,
    ) -> Result<ResolvedGenerator, PipelineError> {
        if self.cache.exists(topic) {
            let artifact = self.cache.load(topic)?;
            match self.from_cache(&artifact, schema) {
                Ok(generator) => {
                    tracing::info!("Loading existing generator for topic '{topic}'");
                    return Ok(ResolvedGenerator {
                        generator,
                        origin: ArtifactOrigin::Cached,
                    });
                }
                Err(e) if self.options.regenerate_stale && is_stale(&e) => {
                    tracing::warn!("Regenerating generator for topic '{topic}': {e}");
                    self.cache.remove(topic)?;
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!("No existing generator found for topic '{topic}'. Generating a new one");
        let generator = self.synthesize_and_store(topic, schema).await?;
        Ok(ResolvedGenerator {
            generator,
            origin: ArtifactOrigin::Synthesized,
        })
    }

    fn from_cache(
        &self,
        artifact: &GeneratorArtifact,
        schema: &SchemaDocument,
    ) -> Result<PlanGenerator, PipelineError> {
        let path = self.cache.path_for(&artifact.topic)?;
        let plan = artifact.plan().map_err(|e| CacheError::Malformed {
            path,
            reason: e.to_string(),
        })?;

        let current = schema.fingerprint();
        match plan.schema_fingerprint.as_deref() {
            Some(recorded) if recorded != current => {
                if self.options.regenerate_stale {
                    return Err(PipelineError::StaleArtifact {
                        topic: artifact.topic.clone(),
                        reason: format!(
                            "schema fingerprint changed from {recorded} to {current}"
                        ),
                    });
                }
                tracing::warn!(
                    "Schema for topic '{}' changed since its generator was accepted ({} -> {}); \
                     events may not match the registered schema",
                    artifact.topic,
                    recorded,
                    current
                );
            }
            None => {
                tracing::debug!(
                    "Generator for topic '{}' records no schema fingerprint",
                    artifact.topic
                );
            }
            Some(_) => {}
        }

        PlanGenerator::compile(plan, schema.schema(), self.options.seed).map_err(|e| {
            PipelineError::StaleArtifact {
                topic: artifact.topic.clone(),
                reason: e.to_string(),
            }
        })
    }

    async fn synthesize_and_store(
        &self,
        topic: &str,
        schema: &SchemaDocument,
    ) -> Result<PlanGenerator, PipelineError> {
        let candidate = self.synthesizer.synthesize(schema).await?;

        let plan = GeneratorPlan::from_yaml(&candidate).map_err(SynthesisError::from)?;
        let generator = PlanGenerator::compile(plan, schema.schema(), self.options.seed)
            .map_err(SynthesisError::from)?;

        let verdict = self.verifier.verify(&candidate, schema).await?;
        if !verdict.accepted {
            tracing::error!(
                "Generated code verification failed. Response: {}",
                verdict.raw_response
            );
            return Err(PipelineError::VerificationRejected {
                response: verdict.raw_response,
            });
        }
        tracing::info!("Verification successful");

        let accepted = generator
            .plan()
            .clone()
            .with_fingerprint(schema.fingerprint());
        let source = accepted.to_yaml().map_err(SynthesisError::from)?;
        self.cache.store(&GeneratorArtifact::new(topic, source))?;

        Ok(generator)
    }
}

fn is_stale(err: &PipelineError) -> bool {
    matches!(
        err,
        PipelineError::StaleArtifact { .. } | PipelineError::Cache(CacheError::Malformed { .. })
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::VerificationResult;
    use async_trait::async_trait;
    use event_generator::EventGenerator;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    const SCHEMA: &str = r#"{"type": "record", "name": "Payment", "fields": [
        {"name": "Id", "type": "string"},
        {"name": "Amount", "type": "long"},
        {"name": "AmountFormatted", "type": "string"}
    ]}"#;

    const PLAN: &str = r#"
record: Payment
fields:
  - name: Id
    generator: { type: uuid_v4 }
  - name: Amount
    generator: { type: int_range, min: 100, max: 100000 }
  - name: AmountFormatted
    generator: { type: minor_units_formatted, source: Amount }
"#;

    struct StubSynthesizer {
        response: Result<String, fn() -> SynthesisError>,
        calls: AtomicUsize,
    }

    impl StubSynthesizer {
        fn returning(text: &str) -> Arc<Self> {
            Arc::new(Self {
                response: Ok(text.to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(err: fn() -> SynthesisError) -> Arc<Self> {
            Arc::new(Self {
                response: Err(err),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Synthesizer for StubSynthesizer {
        async fn synthesize(&self, _schema: &SchemaDocument) -> Result<String, SynthesisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.response {
                Ok(text) => Ok(text.clone()),
                Err(make) => Err(make()),
            }
        }
    }

    struct StubVerifier {
        verdict: String,
        calls: AtomicUsize,
    }

    impl StubVerifier {
        fn answering(verdict: &str) -> Arc<Self> {
            Arc::new(Self {
                verdict: verdict.to_string(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Verifier for StubVerifier {
        async fn verify(
            &self,
            _candidate: &str,
            _schema: &SchemaDocument,
        ) -> Result<VerificationResult, SynthesisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(VerificationResult::from_response(&self.verdict))
        }
    }

    fn schema() -> SchemaDocument {
        SchemaDocument::new("payments-value", SCHEMA, Some(1), Some(1)).unwrap()
    }

    fn pipeline(
        dir: &TempDir,
        synthesizer: Arc<StubSynthesizer>,
        verifier: Arc<StubVerifier>,
        regenerate_stale: bool,
    ) -> GeneratorPipeline {
        GeneratorPipeline::new(
            GeneratorCache::open(dir.path()).unwrap(),
            synthesizer,
            verifier,
            PipelineOptions {
                regenerate_stale,
                seed: Some(7),
            },
        )
    }

    fn assert_valid_event(generator: &mut PlanGenerator) {
        let event = generator.generate(false);
        let amount = event.get("Amount").unwrap().as_i64().unwrap();
        let formatted = event.get("AmountFormatted").unwrap().as_str().unwrap();
        assert_eq!(formatted, format!("{}.{:02}", amount / 100, amount % 100));
    }

    #[tokio::test]
    async fn test_synthesis_runs_at_most_once_per_topic() {
        let tmp = TempDir::new().unwrap();
        let synthesizer = StubSynthesizer::returning(PLAN);
        let verifier = StubVerifier::answering("Yes");

        let first = pipeline(&tmp, synthesizer.clone(), verifier.clone(), false);
        let mut resolved = first.resolve("payments", &schema()).await.unwrap();
        assert_eq!(resolved.origin, ArtifactOrigin::Synthesized);
        assert_valid_event(&mut resolved.generator);

        // A second run over the same cache directory
        let second = pipeline(&tmp, synthesizer.clone(), verifier.clone(), false);
        let mut resolved = second.resolve("payments", &schema()).await.unwrap();
        assert_eq!(resolved.origin, ArtifactOrigin::Cached);
        assert_valid_event(&mut resolved.generator);

        assert_eq!(synthesizer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stored_artifact_records_fingerprint() {
        let tmp = TempDir::new().unwrap();
        let pipeline = pipeline(
            &tmp,
            StubSynthesizer::returning(PLAN),
            StubVerifier::answering("yes"),
            false,
        );
        pipeline.resolve("payments", &schema()).await.unwrap();

        let plan = pipeline.cache().load("payments").unwrap().plan().unwrap();
        assert_eq!(plan.schema_fingerprint, Some(schema().fingerprint()));
    }

    #[tokio::test]
    async fn test_rejection_halts_without_persisting() {
        let tmp = TempDir::new().unwrap();
        let pipeline = pipeline(
            &tmp,
            StubSynthesizer::returning(PLAN),
            StubVerifier::answering("no"),
            false,
        );

        let result = pipeline.resolve("payments", &schema()).await;
        assert!(matches!(
            result,
            Err(PipelineError::VerificationRejected { ref response }) if response == "no"
        ));
        assert!(!pipeline.cache().exists("payments"));
    }

    #[tokio::test]
    async fn test_unusable_candidate_skips_verifier() {
        let tmp = TempDir::new().unwrap();
        let verifier = StubVerifier::answering("yes");
        let pipeline = pipeline(
            &tmp,
            StubSynthesizer::returning("def generate_event():\n    return {}"),
            verifier.clone(),
            false,
        );

        let result = pipeline.resolve("payments", &schema()).await;
        assert!(matches!(
            result,
            Err(PipelineError::Synthesis(SynthesisError::Unusable(_)))
        ));
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 0);
        assert!(!pipeline.cache().exists("payments"));
    }

    #[tokio::test]
    async fn test_candidate_violating_contract_is_unusable() {
        let tmp = TempDir::new().unwrap();
        let incomplete = "record: Payment\nfields:\n  - name: Id\n    generator: { type: uuid_v4 }\n";
        let pipeline = pipeline(
            &tmp,
            StubSynthesizer::returning(incomplete),
            StubVerifier::answering("yes"),
            false,
        );

        let result = pipeline.resolve("payments", &schema()).await;
        assert!(matches!(
            result,
            Err(PipelineError::Synthesis(SynthesisError::Unusable(_)))
        ));
    }

    #[tokio::test]
    async fn test_backend_failure_is_surfaced() {
        let tmp = TempDir::new().unwrap();
        let pipeline = pipeline(
            &tmp,
            StubSynthesizer::failing(|| SynthesisError::MissingCredential),
            StubVerifier::answering("yes"),
            false,
        );

        let result = pipeline.resolve("payments", &schema()).await;
        assert!(matches!(
            result,
            Err(PipelineError::Synthesis(SynthesisError::MissingCredential))
        ));
        assert!(!pipeline.cache().exists("payments"));
    }

    fn seed_cache(tmp: &TempDir, source: &str) {
        GeneratorCache::open(tmp.path())
            .unwrap()
            .store(&GeneratorArtifact::new("payments", source))
            .unwrap();
    }

    #[tokio::test]
    async fn test_fingerprint_mismatch_only_warns_by_default() {
        let tmp = TempDir::new().unwrap();
        seed_cache(&tmp, &format!("schema_fingerprint: deadbeef\n{PLAN}"));
        let synthesizer = StubSynthesizer::returning(PLAN);

        let pipeline = pipeline(&tmp, synthesizer.clone(), StubVerifier::answering("yes"), false);
        let resolved = pipeline.resolve("payments", &schema()).await.unwrap();

        assert_eq!(resolved.origin, ArtifactOrigin::Cached);
        assert_eq!(synthesizer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fingerprint_mismatch_regenerates_when_asked() {
        let tmp = TempDir::new().unwrap();
        seed_cache(&tmp, &format!("schema_fingerprint: deadbeef\n{PLAN}"));
        let synthesizer = StubSynthesizer::returning(PLAN);

        let pipeline = pipeline(&tmp, synthesizer.clone(), StubVerifier::answering("yes"), true);
        let resolved = pipeline.resolve("payments", &schema()).await.unwrap();

        assert_eq!(resolved.origin, ArtifactOrigin::Synthesized);
        assert_eq!(synthesizer.calls.load(Ordering::SeqCst), 1);
        let plan = pipeline.cache().load("payments").unwrap().plan().unwrap();
        assert_eq!(plan.schema_fingerprint, Some(schema().fingerprint()));
    }

    #[tokio::test]
    async fn test_cached_plan_breaking_contract_is_fatal() {
        let tmp = TempDir::new().unwrap();
        seed_cache(
            &tmp,
            "record: Payment\nfields:\n  - name: Id\n    generator: { type: uuid_v4 }\n",
        );
        let synthesizer = StubSynthesizer::returning(PLAN);

        let pipeline = pipeline(&tmp, synthesizer.clone(), StubVerifier::answering("yes"), false);
        let result = pipeline.resolve("payments", &schema()).await;

        assert!(matches!(result, Err(PipelineError::StaleArtifact { .. })));
        assert_eq!(synthesizer.calls.load(Ordering::SeqCst), 0);
        assert!(pipeline.cache().exists("payments"));
    }

    #[tokio::test]
    async fn test_malformed_cache_entry_regenerates_when_asked() {
        let tmp = TempDir::new().unwrap();
        seed_cache(&tmp, "this is not a plan");

        let strict = pipeline(
            &tmp,
            StubSynthesizer::returning(PLAN),
            StubVerifier::answering("yes"),
            false,
        );
        assert!(matches!(
            strict.resolve("payments", &schema()).await,
            Err(PipelineError::Cache(CacheError::Malformed { .. }))
        ));

        let lenient = pipeline(
            &tmp,
            StubSynthesizer::returning(PLAN),
            StubVerifier::answering("yes"),
            true,
        );
        let resolved = lenient.resolve("payments", &schema()).await.unwrap();
        assert_eq!(resolved.origin, ArtifactOrigin::Synthesized);
    }
}
