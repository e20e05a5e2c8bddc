//! Model Artifact - classifier + scaler + feature schema, immutable after load

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::classifier::{ClassLabel, ClassifierHandle};
use super::scaler::Scaler;
use crate::error::ArtifactLoadError;
use crate::features::FeatureSchema;

// ============================================================================
// METADATA
// ============================================================================

/// Which on-disk shape the artifact was recovered from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactFormat {
    /// `{classifier, scaler, feature_names}`
    Composite,
    /// Bare classifier object, loaded in compatibility mode
    Legacy,
    /// Built in memory, never read from disk
    InMemory,
}

/// Optional training-time facts carried in the artifact file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training_accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub testing_accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_features: Option<usize>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelMetadata {
    pub source: String,
    pub format: ArtifactFormat,
    pub classifier_kind: String,
    pub loaded_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub training: Option<TrainingMetadata>,
}

// ============================================================================
// ARTIFACT
// ============================================================================

/// Everything inference needs, validated for internal consistency.
///
/// Only constructed through [`ModelArtifact::new`] (or the loader, which
/// calls it), so a value of this type is always usable.
#[derive(Debug)]
pub struct ModelArtifact {
    classifier: ClassifierHandle,
    scaler: Option<Scaler>,
    schema: FeatureSchema,
    metadata: ModelMetadata,
}

impl ModelArtifact {
    pub fn new(
        classifier: ClassifierHandle,
        scaler: Option<Scaler>,
        schema: FeatureSchema,
    ) -> Result<Self, ArtifactLoadError> {
        check_consistency(&classifier, scaler.as_ref(), &schema)
            .map_err(ArtifactLoadError::Inconsistent)?;

        let metadata = ModelMetadata {
            source: "<memory>".to_string(),
            format: ArtifactFormat::InMemory,
            classifier_kind: classifier.kind().to_string(),
            loaded_at: Utc::now(),
            training: None,
        };

        Ok(Self {
            classifier,
            scaler,
            schema,
            metadata,
        })
    }

    pub(crate) fn with_source(mut self, source: String) -> Self {
        self.metadata.source = source;
        self
    }

    pub(crate) fn with_format(mut self, format: ArtifactFormat) -> Self {
        self.metadata.format = format;
        self
    }

    pub(crate) fn with_training(mut self, training: Option<TrainingMetadata>) -> Self {
        self.metadata.training = training;
        self
    }

    pub fn classifier(&self) -> &ClassifierHandle {
        &self.classifier
    }

    pub fn scaler(&self) -> Option<&Scaler> {
        self.scaler.as_ref()
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub fn feature_names(&self) -> Option<&[String]> {
        self.schema.feature_names()
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self.schema, FeatureSchema::Lenient)
    }

    /// Summary for status endpoints and logs
    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            model_type: self.classifier.kind().to_string(),
            features: self.feature_names().map(<[String]>::to_vec).unwrap_or_default(),
            schema_mode: match self.schema {
                FeatureSchema::Declared(_) => "declared",
                FeatureSchema::Lenient => "lenient",
            },
            layout_hash: self.schema.layout_hash(),
            scaler: self.scaler.as_ref().map(|s| s.kind()).unwrap_or("none"),
            probabilistic: self.classifier.is_probabilistic(),
            classes: self.classifier.classes().map(<[ClassLabel]>::to_vec),
            metadata: self.metadata.clone(),
        }
    }
}

/// Read-only description of the loaded model
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub model_type: String,
    pub features: Vec<String>,
    pub schema_mode: &'static str,
    pub layout_hash: u32,
    pub scaler: &'static str,
    pub probabilistic: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<ClassLabel>>,
    pub metadata: ModelMetadata,
}

fn check_consistency(
    classifier: &ClassifierHandle,
    scaler: Option<&Scaler>,
    schema: &FeatureSchema,
) -> Result<(), String> {
    if let Some(scaler) = scaler {
        scaler.validate()?;
    }

    match schema {
        FeatureSchema::Declared(names) => {
            if names.is_empty() {
                return Err("feature_names is empty".to_string());
            }
            let mut seen = HashSet::new();
            for name in names {
                if !seen.insert(name.as_str()) {
                    return Err(format!("feature `{}` listed more than once", name));
                }
            }

            let width = names.len();
            if let Some(n) = scaler.and_then(Scaler::n_features) {
                if n != width {
                    return Err(format!(
                        "scaler fitted on {} features but feature_names has {}",
                        n, width
                    ));
                }
            }
            if let Some(n) = classifier.n_features() {
                if n != width {
                    return Err(format!(
                        "classifier expects {} features but feature_names has {}",
                        n, width
                    ));
                }
            }
        }
        FeatureSchema::Lenient => {
            if scaler.and_then(Scaler::n_features).is_some() {
                return Err("a fitted scaler requires declared feature_names".to_string());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::classifier::ClassifierSpec;

    fn rule(width: usize) -> ClassifierHandle {
        let weights = vec![1.0; width];
        let spec: ClassifierSpec = serde_json::from_value(serde_json::json!({
            "kind": "linear_rule",
            "weights": weights,
        }))
        .unwrap();
        spec.into_handle().unwrap()
    }

    fn names(n: &[&str]) -> FeatureSchema {
        FeatureSchema::Declared(n.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_consistent_artifact() {
        let artifact = ModelArtifact::new(rule(2), Some(Scaler::Identity), names(&["a", "b"])).unwrap();
        let info = artifact.info();
        assert_eq!(info.model_type, "linear_rule");
        assert_eq!(info.features, vec!["a", "b"]);
        assert!(!info.probabilistic);
        assert_eq!(info.metadata.format, ArtifactFormat::InMemory);
    }

    #[test]
    fn test_classifier_width_mismatch() {
        let err = ModelArtifact::new(rule(3), None, names(&["a", "b"])).unwrap_err();
        assert!(matches!(err, ArtifactLoadError::Inconsistent(_)));
    }

    #[test]
    fn test_scaler_width_mismatch() {
        let scaler = Scaler::Standard {
            mean: vec![0.0],
            scale: vec![1.0],
        };
        let err = ModelArtifact::new(rule(2), Some(scaler), names(&["a", "b"])).unwrap_err();
        assert!(matches!(err, ArtifactLoadError::Inconsistent(_)));
    }

    #[test]
    fn test_duplicate_feature_names() {
        let err = ModelArtifact::new(rule(2), None, names(&["a", "a"])).unwrap_err();
        assert!(matches!(err, ArtifactLoadError::Inconsistent(_)));
    }

    #[test]
    fn test_lenient_rejects_fitted_scaler() {
        let scaler = Scaler::Standard {
            mean: vec![0.0],
            scale: vec![1.0],
        };
        assert!(ModelArtifact::new(rule(1), Some(scaler), FeatureSchema::Lenient).is_err());
        assert!(ModelArtifact::new(rule(1), Some(Scaler::Identity), FeatureSchema::Lenient).is_ok());
    }
}
