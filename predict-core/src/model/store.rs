//! Model Store - one-time model initialization for the whole process
//!
//! The store is constructed explicitly and shared (usually behind `Arc`)
//! with whatever handles requests. It starts empty; `initialize` loads the
//! artifact exactly once. Loading a different model later needs a restart.

use std::path::Path;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing::{info, warn};

use super::artifact::{ModelArtifact, ModelInfo};
use super::inference::{InferenceEngine, PredictionResult};
use super::loader::{self, LoadOptions};
use crate::error::{ArtifactLoadError, PredictError};
use crate::features::FeatureInput;

/// Store status for health/info endpoints
#[derive(Debug, Clone, Serialize)]
pub struct StoreStatus {
    pub model_loaded: bool,
    pub model_name: String,
    pub source: Option<String>,
    pub inference_count: u64,
    pub avg_latency_ms: f32,
}

#[derive(Debug, Default)]
pub struct ModelStore {
    engine: OnceCell<InferenceEngine>,
    options: LoadOptions,
}

impl ModelStore {
    /// Empty store; every prediction fails until `initialize` succeeds
    pub fn new(options: LoadOptions) -> Self {
        Self {
            engine: OnceCell::new(),
            options,
        }
    }

    /// Store that is already initialized with an in-memory artifact
    pub fn from_artifact(artifact: ModelArtifact) -> Self {
        Self {
            engine: OnceCell::with_value(InferenceEngine::new(Arc::new(artifact))),
            options: LoadOptions::default(),
        }
    }

    /// Load the artifact at `path`. Concurrent callers block until the first
    /// load finishes; only one load ever runs. Calling this again after a
    /// successful load is rejected.
    pub fn initialize<P: AsRef<Path>>(&self, path: P) -> Result<(), ArtifactLoadError> {
        let path = path.as_ref();
        let mut loaded_here = false;

        let engine = self.engine.get_or_try_init(|| {
            loaded_here = true;
            loader::load(path, &self.options).map(|artifact| InferenceEngine::new(Arc::new(artifact)))
        })?;

        if loaded_here {
            info!(path = %path.display(), "Model store initialized");
            return Ok(());
        }

        let loaded = engine.artifact().metadata().source.clone();
        warn!(loaded = %loaded, requested = %path.display(), "Model already loaded; restart required to load another");
        Err(ArtifactLoadError::AlreadyInitialized {
            loaded,
            requested: path.display().to_string(),
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.engine.get().is_some()
    }

    /// The loaded engine, or `NotInitialized`
    pub fn engine(&self) -> Result<&InferenceEngine, PredictError> {
        self.engine.get().ok_or(PredictError::NotInitialized)
    }

    /// Shared handle to the loaded artifact
    pub fn artifact(&self) -> Result<Arc<ModelArtifact>, PredictError> {
        self.engine().map(|e| Arc::clone(e.artifact()))
    }

    /// Entry point for callers: one record or a batch in, labels out
    pub fn predict_records(&self, input: impl Into<FeatureInput>) -> Result<PredictionResult, PredictError> {
        self.engine()?.predict_records(input)
    }

    pub fn model_info(&self) -> Result<ModelInfo, PredictError> {
        self.engine().map(|e| e.artifact().info())
    }

    pub fn status(&self) -> StoreStatus {
        match self.engine.get() {
            Some(engine) => {
                let stats = engine.stats();
                let meta = engine.artifact().metadata();
                StoreStatus {
                    model_loaded: true,
                    model_name: meta.classifier_kind.clone(),
                    source: Some(meta.source.clone()),
                    inference_count: stats.inference_count,
                    avg_latency_ms: stats.avg_latency_ms,
                }
            }
            None => StoreStatus {
                model_loaded: false,
                model_name: "None".to_string(),
                source: None,
                inference_count: 0,
                avg_latency_ms: 0.0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureRecord;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const ARTIFACT: &str = r#"{
        "classifier": {"kind": "linear_rule", "weights": [1.0, 1.0]},
        "scaler": null,
        "feature_names": ["a", "b"]
    }"#;

    fn artifact_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(ARTIFACT.as_bytes()).unwrap();
        file
    }

    fn record() -> FeatureRecord {
        [("a", 1.0), ("b", 1.0)].into_iter().collect()
    }

    #[test]
    fn test_predict_before_initialize() {
        let store = ModelStore::new(LoadOptions::default());
        assert!(!store.is_initialized());
        assert_eq!(store.predict_records(record()).unwrap_err(), PredictError::NotInitialized);
        assert!(store.model_info().is_err());
        assert!(!store.status().model_loaded);
    }

    #[test]
    fn test_initialize_then_predict() {
        let file = artifact_file();
        let store = ModelStore::new(LoadOptions::default());
        store.initialize(file.path()).unwrap();

        assert!(store.is_initialized());
        let result = store.predict_records(record()).unwrap();
        assert_eq!(result.len(), 1);

        let status = store.status();
        assert!(status.model_loaded);
        assert_eq!(status.model_name, "linear_rule");
        assert_eq!(status.inference_count, 1);
    }

    #[test]
    fn test_from_artifact_is_initialized() {
        let artifact = loader::from_json_str(ARTIFACT, &LoadOptions::default()).unwrap();
        let store = ModelStore::from_artifact(artifact);

        assert!(store.is_initialized());
        assert!(store.predict_records(record()).is_ok());
        assert!(matches!(
            store.initialize("other/model.json"),
            Err(ArtifactLoadError::AlreadyInitialized { .. })
        ));
    }

    #[test]
    fn test_second_initialize_rejected() {
        let file = artifact_file();
        let store = ModelStore::new(LoadOptions::default());
        store.initialize(file.path()).unwrap();

        let err = store.initialize("other/model.json").unwrap_err();
        assert!(matches!(err, ArtifactLoadError::AlreadyInitialized { .. }));
        // First model still serves
        assert!(store.predict_records(record()).is_ok());
    }

    #[test]
    fn test_failed_initialize_leaves_store_empty() {
        let store = ModelStore::new(LoadOptions::default());
        assert!(store.initialize("does/not/exist.json").is_err());
        assert!(!store.is_initialized());

        // A later attempt with a valid path can still succeed
        let file = artifact_file();
        store.initialize(file.path()).unwrap();
        assert!(store.is_initialized());
    }

    #[test]
    fn test_concurrent_initialize_loads_once() {
        let file = artifact_file();
        let store = Arc::new(ModelStore::new(LoadOptions::default()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let path = file.path().to_path_buf();
                std::thread::spawn(move || store.initialize(path).is_ok())
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(successes, 1);
    }
}
