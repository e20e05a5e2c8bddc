//! Model Module - artifact loading and inference
//!
//! `store` owns the one loaded artifact; `inference` runs the
//! validate → scale → classify pipeline over it.

pub mod artifact;
pub mod classifier;
pub mod inference;
pub mod loader;
pub mod scaler;
pub mod store;

#[cfg(test)]
mod tests;

// Re-export common types
pub use artifact::{ArtifactFormat, ModelArtifact, ModelInfo, ModelMetadata, TrainingMetadata};
pub use classifier::{
    ClassLabel, Classifier, ClassifierError, ClassifierHandle, ClassifierSpec, ProbabilisticClassifier,
};
pub use inference::{EngineStats, InferenceEngine, PredictionResult};
pub use loader::{load, LoadOptions};
pub use scaler::Scaler;
pub use store::{ModelStore, StoreStatus};
