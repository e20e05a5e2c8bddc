//! Error types for the prediction pipeline
//!
//! Three families, matching when they can happen:
//! - [`ArtifactLoadError`]: startup only, while reading the model artifact
//! - [`PredictError`]: per call, from `predict_records`
//! - [`IngestError`]: while turning an uploaded table into records

use std::collections::BTreeSet;
use std::path::PathBuf;

use thiserror::Error;

// ============================================================================
// ARTIFACT LOADING
// ============================================================================

#[derive(Debug, Error)]
pub enum ArtifactLoadError {
    #[error("model artifact not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read model artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to deserialize model artifact: {0}")]
    Deserialize(String),

    #[error("model artifact is missing the required `classifier` field")]
    MissingClassifier,

    #[error("artifact holds a bare classifier; legacy loading is disabled (set ALLOW_LEGACY_MODEL=true to accept it)")]
    LegacyFormatRejected,

    #[error("model artifact is inconsistent: {0}")]
    Inconsistent(String),

    #[error("model already loaded from {loaded}; restart required to load {requested}")]
    AlreadyInitialized { loaded: String, requested: String },
}

// ============================================================================
// PREDICTION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictError {
    #[error("predictor not initialized; load a model artifact first")]
    NotInitialized,

    #[error("no feature records supplied")]
    EmptyBatch,

    #[error("record {record} is missing required features: {}", join(missing))]
    MissingFeatures {
        record: usize,
        missing: BTreeSet<String>,
    },

    #[error("record {record} does not match the schema of the first record (expected [{}], found [{}])", expected.join(", "), found.join(", "))]
    InconsistentSchema {
        record: usize,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("preprocessing failed for column `{column}`: {reason}")]
    Preprocessing { column: String, reason: String },

    #[error("inference failed: {0}")]
    Inference(String),
}

impl PredictError {
    /// Stable identifier for callers that branch on the failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            PredictError::NotInitialized => "predictor_not_initialized",
            PredictError::EmptyBatch => "empty_batch",
            PredictError::MissingFeatures { .. } => "missing_features",
            PredictError::InconsistentSchema { .. } => "inconsistent_schema",
            PredictError::Preprocessing { .. } => "preprocessing_error",
            PredictError::Inference(_) => "inference_error",
        }
    }

    /// True when resubmitting corrected input can resolve the error
    pub fn is_caller_input(&self) -> bool {
        matches!(
            self,
            PredictError::EmptyBatch
                | PredictError::MissingFeatures { .. }
                | PredictError::InconsistentSchema { .. }
                | PredictError::Preprocessing { .. }
        )
    }
}

fn join(names: &BTreeSet<String>) -> String {
    names.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

// ============================================================================
// INGESTION
// ============================================================================

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("file contains no header row")]
    Empty,

    #[error("row {line} has {found} fields, header has {expected}")]
    RaggedRow {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("unterminated quoted field starting on line {0}")]
    UnterminatedQuote(usize),
}

impl IngestError {
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::Io { .. } => "ingest_io_error",
            IngestError::UnsupportedFormat(_) => "unsupported_format",
            IngestError::Empty => "empty_table",
            IngestError::RaggedRow { .. } | IngestError::UnterminatedQuote(_) => "malformed_table",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_features_message_lists_names() {
        let err = PredictError::MissingFeatures {
            record: 2,
            missing: ["b".to_string(), "a".to_string()].into_iter().collect(),
        };
        assert_eq!(
            err.to_string(),
            "record 2 is missing required features: a, b"
        );
        assert_eq!(err.kind(), "missing_features");
        assert!(err.is_caller_input());
    }

    #[test]
    fn test_runtime_errors_are_not_caller_input() {
        assert!(!PredictError::NotInitialized.is_caller_input());
        assert!(!PredictError::Inference("shape".into()).is_caller_input());
    }

    #[test]
    fn test_ingest_kinds() {
        assert_eq!(IngestError::Empty.kind(), "empty_table");
        assert_eq!(IngestError::UnterminatedQuote(3).kind(), "malformed_table");
        assert_eq!(IngestError::UnsupportedFormat(".xlsx".into()).kind(), "unsupported_format");
    }
}
