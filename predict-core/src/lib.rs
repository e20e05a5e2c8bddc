//! Predict Core - tabular classifier serving
//!
//! Loads one pre-trained model artifact per process and turns feature
//! records into class labels:
//!
//! ```text
//! records → validate_and_align → scale → classify → PredictionResult
//! ```
//!
//! - [`model`]: artifact loading, classifiers, scalers, the model store
//! - [`features`]: feature records and column alignment
//! - [`ingest`]: uploaded CSV tables → feature records
//! - [`error`]: error families for load, predict and ingest

pub mod error;
pub mod features;
pub mod ingest;
pub mod model;

pub use error::{ArtifactLoadError, IngestError, PredictError};
pub use features::{FeatureInput, FeatureRecord, FeatureSchema, FeatureValue};
pub use model::{ClassLabel, LoadOptions, ModelInfo, ModelStore, PredictionResult, StoreStatus};
