//! On-disk store of accepted generator artifacts, keyed by topic.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use event_generator::GeneratorPlan;

use crate::error::CacheError;

/// Suffix of an artifact file: `{topic}_datagen.yaml`.
pub const ARTIFACT_SUFFIX: &str = "_datagen.yaml";

/// An accepted generator for one topic.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorArtifact {
    pub topic: String,
    pub source: String,
}

impl GeneratorArtifact {
    pub fn new(topic: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            source: source.into(),
        }
    }

    /// Parse the artifact source as a generator plan.
    pub fn plan(&self) -> Result<GeneratorPlan, event_generator::PlanError> {
        GeneratorPlan::from_yaml(&self.source)
    }
}

/// Filesystem cache of generator artifacts.
///
/// Artifacts are write-once: `store` refuses to overwrite, and a stale
/// artifact must be removed explicitly before a new one is stored.
#[derive(Debug, Clone)]
pub struct GeneratorCache {
    dir: PathBuf,
}

impl GeneratorCache {
    /// Open the cache, creating the directory if absent.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| CacheError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the artifact for `topic`.
    pub fn path_for(&self, topic: &str) -> Result<PathBuf, CacheError> {
        validate_topic(topic)?;
        Ok(self.dir.join(format!("{topic}{ARTIFACT_SUFFIX}")))
    }

    pub fn exists(&self, topic: &str) -> bool {
        self.path_for(topic).map(|p| p.is_file()).unwrap_or(false)
    }

    pub fn load(&self, topic: &str) -> Result<GeneratorArtifact, CacheError> {
        let path = self.path_for(topic)?;
        let source = std::fs::read_to_string(&path).map_err(|source| CacheError::Io {
            path: path.clone(),
            source,
        })?;
        if source.trim().is_empty() {
            return Err(CacheError::Malformed {
                path,
                reason: "artifact is empty".to_string(),
            });
        }
        tracing::debug!("Loaded generator artifact from {}", path.display());
        Ok(GeneratorArtifact::new(topic, source))
    }

    /// Persist an artifact. Fails if one is already stored for the topic.
    pub fn store(&self, artifact: &GeneratorArtifact) -> Result<PathBuf, CacheError> {
        let path = self.path_for(&artifact.topic)?;
        let io_err = |source| CacheError::Io {
            path: path.clone(),
            source,
        };

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(CacheError::AlreadyExists(path.clone()));
            }
            Err(e) => return Err(io_err(e)),
        };
        file.write_all(artifact.source.as_bytes()).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;

        tracing::info!("Stored generator artifact to {}", path.display());
        Ok(path)
    }

    /// Delete the artifact for `topic`. Returns whether one existed.
    pub fn remove(&self, topic: &str) -> Result<bool, CacheError> {
        let path = self.path_for(topic)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!("Removed generator artifact {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(CacheError::Io { path, source }),
        }
    }
}

fn validate_topic(topic: &str) -> Result<(), CacheError> {
    let valid = !topic.is_empty()
        && topic != "."
        && topic != ".."
        && topic
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(CacheError::InvalidTopic(topic.to_string()))
    }
}
