//! Artifact Loader - reads a serialized model from disk
//!
//! Two on-disk shapes are recognised:
//! - composite: `{ "classifier": {...}, "scaler": {...}, "feature_names": [...], "metadata": {...} }`
//!   (the training script writes the classifier under `model`; both names are accepted)
//! - legacy: a bare classifier object at top level
//!
//! Legacy files carry no feature list, so inference falls back to the
//! caller's column order. That mode is off unless explicitly enabled.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info, warn};

use super::artifact::{ArtifactFormat, ModelArtifact, TrainingMetadata};
use super::classifier::ClassifierSpec;
use super::scaler::Scaler;
use crate::error::ArtifactLoadError;
use crate::features::FeatureSchema;

/// Keys that mark a composite artifact
const COMPOSITE_KEYS: &[&str] = &["classifier", "model", "scaler", "feature_names"];

/// Accepted names for the classifier entry of a composite artifact
const CLASSIFIER_KEYS: &[&str] = &["classifier", "model"];

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Accept a bare classifier (identity scaler, caller-defined columns)
    pub allow_legacy: bool,
}

impl LoadOptions {
    pub fn legacy_compatible() -> Self {
        Self { allow_legacy: true }
    }
}

#[derive(Debug, Deserialize)]
struct CompositeArtifact {
    #[serde(alias = "model")]
    classifier: ClassifierSpec,
    #[serde(default)]
    scaler: Option<Scaler>,
    feature_names: Vec<String>,
    #[serde(default)]
    metadata: Option<TrainingMetadata>,
}

/// Load and validate an artifact file. Failures are logged and returned;
/// there is no retry.
pub fn load<P: AsRef<Path>>(path: P, options: &LoadOptions) -> Result<ModelArtifact, ArtifactLoadError> {
    let path = path.as_ref();
    info!(path = %path.display(), allow_legacy = options.allow_legacy, "Loading model artifact");

    let result = read_and_parse(path, options);
    match &result {
        Ok(artifact) => {
            let meta = artifact.metadata();
            info!(
                model = %meta.classifier_kind,
                format = ?meta.format,
                features = artifact.feature_names().map(|n| n.len()).unwrap_or(0),
                probabilistic = artifact.classifier().is_probabilistic(),
                "Model loaded successfully"
            );
        }
        Err(e) => error!(path = %path.display(), error = %e, "Error loading model"),
    }
    result
}

fn read_and_parse(path: &Path, options: &LoadOptions) -> Result<ModelArtifact, ArtifactLoadError> {
    if !path.exists() {
        return Err(ArtifactLoadError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path).map_err(|source| ArtifactLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    from_json_str(&content, options).map(|artifact| artifact.with_source(path.display().to_string()))
}

/// Parse an artifact from JSON text
pub fn from_json_str(content: &str, options: &LoadOptions) -> Result<ModelArtifact, ArtifactLoadError> {
    let value: Value =
        serde_json::from_str(content).map_err(|e| ArtifactLoadError::Deserialize(e.to_string()))?;

    let is_composite = value
        .as_object()
        .map(|obj| COMPOSITE_KEYS.iter().any(|k| obj.contains_key(*k)))
        .unwrap_or(false);

    if is_composite {
        from_composite(value)
    } else {
        from_bare_classifier(value, options)
    }
}

fn from_composite(value: Value) -> Result<ModelArtifact, ArtifactLoadError> {
    let has_classifier = CLASSIFIER_KEYS
        .iter()
        .any(|key| value.get(*key).map_or(false, |v| !v.is_null()));
    if !has_classifier {
        return Err(ArtifactLoadError::MissingClassifier);
    }

    let composite: CompositeArtifact =
        serde_json::from_value(value).map_err(|e| ArtifactLoadError::Deserialize(e.to_string()))?;

    let classifier = composite
        .classifier
        .into_handle()
        .map_err(ArtifactLoadError::Inconsistent)?;

    let artifact = ModelArtifact::new(
        classifier,
        composite.scaler,
        FeatureSchema::Declared(composite.feature_names),
    )?
    .with_format(ArtifactFormat::Composite)
    .with_training(composite.metadata);

    Ok(artifact)
}

fn from_bare_classifier(value: Value, options: &LoadOptions) -> Result<ModelArtifact, ArtifactLoadError> {
    let spec: ClassifierSpec =
        serde_json::from_value(value).map_err(|e| ArtifactLoadError::Deserialize(e.to_string()))?;

    if !options.allow_legacy {
        return Err(ArtifactLoadError::LegacyFormatRejected);
    }

    warn!(
        model = spec_kind(&spec),
        "Loading bare classifier in legacy compatibility mode: identity scaler, caller-defined column order"
    );

    let classifier = spec.into_handle().map_err(ArtifactLoadError::Inconsistent)?;
    let artifact = ModelArtifact::new(classifier, Some(Scaler::Identity), FeatureSchema::Lenient)?
        .with_format(ArtifactFormat::Legacy);

    Ok(artifact)
}

fn spec_kind(spec: &ClassifierSpec) -> &'static str {
    match spec {
        ClassifierSpec::LinearRule(_) => "linear_rule",
        ClassifierSpec::LogisticRegression(_) => "logistic_regression",
        ClassifierSpec::DecisionTree(_) => "decision_tree",
        ClassifierSpec::RandomForest(_) => "random_forest",
    }
}
