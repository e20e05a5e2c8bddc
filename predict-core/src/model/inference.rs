//! Inference Engine - validate, align, scale, classify
//!
//! The engine only exists on top of a successfully loaded artifact, so
//! "predict before load" is handled one level up by the store.
//! Each call is a pure pipeline over immutable artifact state; the only
//! mutable fields are latency counters that never feed back into results.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::artifact::ModelArtifact;
use super::classifier::ClassLabel;
use super::scaler::Scaler;
use crate::error::PredictError;
use crate::features::{validate_and_align, AlignedMatrix, FeatureInput, FeatureRecord};

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Prediction output, one entry per input record in input order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub labels: Vec<ClassLabel>,
    /// Per-class probabilities, present only for probabilistic models
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<Vec<Vec<f64>>>,
    /// Column order of `probabilities`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<ClassLabel>>,
}

impl PredictionResult {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Latency counters for status reporting
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct EngineStats {
    pub inference_count: u64,
    pub avg_latency_ms: f32,
}

// ============================================================================
// ENGINE
// ============================================================================

#[derive(Debug)]
pub struct InferenceEngine {
    artifact: Arc<ModelArtifact>,
    latency_sum_us: AtomicU64,
    inference_count: AtomicU64,
}

impl InferenceEngine {
    pub fn new(artifact: Arc<ModelArtifact>) -> Self {
        Self {
            artifact,
            latency_sum_us: AtomicU64::new(0),
            inference_count: AtomicU64::new(0),
        }
    }

    pub fn artifact(&self) -> &Arc<ModelArtifact> {
        &self.artifact
    }

    /// Full pipeline: validate_and_align → scale → predict
    pub fn predict_records(&self, input: impl Into<FeatureInput>) -> Result<PredictionResult, PredictError> {
        let start = Instant::now();
        let records = input.into().into_records();

        let aligned = self.validate_and_align(&records)?;
        let scaled = self.scale(&aligned)?;
        let result = self.predict(&scaled)?;

        let elapsed_us = start.elapsed().as_micros() as u64;
        self.latency_sum_us.fetch_add(elapsed_us, Ordering::Relaxed);
        self.inference_count.fetch_add(1, Ordering::Relaxed);

        debug!(
            model = self.artifact.classifier().kind(),
            rows = result.len(),
            elapsed_us,
            "Prediction complete"
        );

        Ok(result)
    }

    pub fn validate_and_align(&self, records: &[FeatureRecord]) -> Result<AlignedMatrix, PredictError> {
        validate_and_align(records, self.artifact.schema())
    }

    pub fn scale(&self, matrix: &AlignedMatrix) -> Result<Array2<f64>, PredictError> {
        scale(matrix, self.artifact.scaler())
    }

    /// Run the classifier on an already scaled matrix
    pub fn predict(&self, x: &Array2<f64>) -> Result<PredictionResult, PredictError> {
        let classifier = self.artifact.classifier();

        let labels = classifier.predict(x.view()).map_err(|e| {
            warn!(model = classifier.kind(), error = %e, "Classifier rejected input");
            PredictError::Inference(e.to_string())
        })?;
        if labels.len() != x.nrows() {
            return Err(PredictError::Inference(format!(
                "classifier returned {} labels for {} rows",
                labels.len(),
                x.nrows()
            )));
        }

        let (probabilities, classes) = match classifier.probabilistic() {
            Some(model) => {
                let proba = model
                    .predict_proba(x.view())
                    .map_err(|e| PredictError::Inference(e.to_string()))?;
                if proba.nrows() != labels.len() {
                    return Err(PredictError::Inference(format!(
                        "classifier returned {} probability rows for {} labels",
                        proba.nrows(),
                        labels.len()
                    )));
                }
                let rows: Vec<Vec<f64>> = proba.rows().into_iter().map(|r| r.to_vec()).collect();
                (Some(rows), Some(model.classes().to_vec()))
            }
            None => (None, None),
        };

        Ok(PredictionResult {
            labels,
            probabilities,
            classes,
        })
    }

    pub fn stats(&self) -> EngineStats {
        let sum = self.latency_sum_us.load(Ordering::Relaxed);
        let count = self.inference_count.load(Ordering::Relaxed);
        let avg = if count > 0 { (sum as f32 / count as f32) / 1000.0 } else { 0.0 };

        EngineStats {
            inference_count: count,
            avg_latency_ms: avg,
        }
    }
}

// ============================================================================
// PREPROCESSING
// ============================================================================

/// Convert aligned cells to numbers, then apply the fitted scaler (if any)
pub fn scale(matrix: &AlignedMatrix, scaler: Option<&Scaler>) -> Result<Array2<f64>, PredictError> {
    let numeric = to_numeric(matrix)?;
    match scaler {
        Some(scaler) => scaler.transform(numeric, &matrix.columns),
        None => Ok(numeric),
    }
}

fn to_numeric(matrix: &AlignedMatrix) -> Result<Array2<f64>, PredictError> {
    let mut out = Array2::<f64>::zeros((matrix.n_rows(), matrix.n_cols()));

    for (i, row) in matrix.rows.iter().enumerate() {
        for (j, value) in row.iter().enumerate() {
            out[[i, j]] = value.to_f64().map_err(|reason| PredictError::Preprocessing {
                column: matrix.columns[j].clone(),
                reason: format!("{} in row {}", reason, i),
            })?;
        }
    }

    Ok(out)
}
