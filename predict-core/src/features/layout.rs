//! Feature Layout - schema checks and column alignment
//!
//! A loaded model declares its feature names in the exact order the
//! classifier was trained on. Every record is checked against that list and
//! re-ordered to it before anything numeric happens.
//!
//! Rules:
//! 1. Missing declared feature → error listing the missing names
//! 2. Extra keys → dropped silently
//! 3. Column order → always the declared order, never the caller's

use std::collections::BTreeSet;

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

use super::record::{FeatureRecord, FeatureValue};
use crate::error::PredictError;

// ============================================================================
// SCHEMA
// ============================================================================

/// Expected input columns for a loaded model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "feature_names", rename_all = "snake_case")]
pub enum FeatureSchema {
    /// Canonical ordered feature list shipped with the artifact
    Declared(Vec<String>),
    /// Legacy compatibility mode: no list, first record defines the columns
    Lenient,
}

impl FeatureSchema {
    pub fn feature_names(&self) -> Option<&[String]> {
        match self {
            FeatureSchema::Declared(names) => Some(names),
            FeatureSchema::Lenient => None,
        }
    }

    pub fn width(&self) -> Option<usize> {
        self.feature_names().map(|n| n.len())
    }

    /// CRC32 over the declared names, 0 for the lenient schema
    pub fn layout_hash(&self) -> u32 {
        match self {
            FeatureSchema::Declared(names) => compute_layout_hash(names),
            FeatureSchema::Lenient => 0,
        }
    }
}

/// Hash of an ordered feature list, used to spot layout drift between
/// the model and whatever produced the input
pub fn compute_layout_hash(names: &[String]) -> u32 {
    let mut hasher = Hasher::new();
    for name in names {
        hasher.update(name.as_bytes());
        hasher.update(&[0]); // Separator
    }
    hasher.finalize()
}

// ============================================================================
// ALIGNED MATRIX
// ============================================================================

/// Records projected onto the schema's columns, values still raw
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedMatrix {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<FeatureValue>>,
}

impl AlignedMatrix {
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }
}

// ============================================================================
// ALIGNMENT
// ============================================================================

/// Validate every record against the schema and reorder its columns.
///
/// Fails on the first offending record; a batch either aligns completely or
/// not at all.
pub fn validate_and_align(
    records: &[FeatureRecord],
    schema: &FeatureSchema,
) -> Result<AlignedMatrix, PredictError> {
    if records.is_empty() {
        return Err(PredictError::EmptyBatch);
    }

    match schema {
        FeatureSchema::Declared(names) => align_declared(records, names),
        FeatureSchema::Lenient => align_lenient(records),
    }
}

fn align_declared(
    records: &[FeatureRecord],
    names: &[String],
) -> Result<AlignedMatrix, PredictError> {
    let mut rows = Vec::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        let missing: BTreeSet<String> = names
            .iter()
            .filter(|name| !record.contains(name))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(PredictError::MissingFeatures {
                record: index,
                missing,
            });
        }

        let row = names
            .iter()
            .map(|name| record.get(name).cloned().unwrap_or(FeatureValue::Missing))
            .collect();
        rows.push(row);
    }

    Ok(AlignedMatrix {
        columns: names.to_vec(),
        rows,
    })
}

fn align_lenient(records: &[FeatureRecord]) -> Result<AlignedMatrix, PredictError> {
    let columns: Vec<String> = records[0].keys().map(str::to_string).collect();
    let expected: BTreeSet<&str> = columns.iter().map(String::as_str).collect();

    let mut rows = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let found: BTreeSet<&str> = record.keys().collect();
        if found != expected {
            return Err(PredictError::InconsistentSchema {
                record: index,
                expected: columns.clone(),
                found: record.keys().map(str::to_string).collect(),
            });
        }

        let row = columns
            .iter()
            .map(|name| record.get(name).cloned().unwrap_or(FeatureValue::Missing))
            .collect();
        rows.push(row);
    }

    Ok(AlignedMatrix { columns, rows })
}
