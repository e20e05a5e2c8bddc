//! Features Module - caller input and schema alignment
//!
//! Records arrive as name → value maps; `layout` turns them into
//! column-aligned rows matching the loaded model.

pub mod record;
pub mod layout;

// Re-export common types
pub use record::{is_na_cell, FeatureInput, FeatureRecord, FeatureValue};
pub use layout::{validate_and_align, AlignedMatrix, FeatureSchema};
