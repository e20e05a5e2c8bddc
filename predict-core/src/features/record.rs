//! Feature Records - caller-supplied input rows
//!
//! A record maps feature name to value and remembers insertion order,
//! because the lenient schema derives its column order from the first record.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ============================================================================
// FEATURE VALUE
// ============================================================================

/// A single cell as submitted by the caller, before numeric conversion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Number(f64),
    Bool(bool),
    Text(String),
    Missing,
}

impl FeatureValue {
    /// Numeric view of the cell, or a reason why it has none.
    /// NaN and infinities count as having none.
    pub fn to_f64(&self) -> Result<f64, String> {
        let value = match self {
            FeatureValue::Number(v) => *v,
            FeatureValue::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            FeatureValue::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("non-numeric value {:?}", s))?,
            FeatureValue::Missing => return Err("missing value".to_string()),
        };

        if !value.is_finite() {
            return Err(format!("non-finite value {}", value));
        }
        Ok(value)
    }

    /// Parse a raw table cell: empty or NA marker → Missing, numeric → Number, else Text
    pub fn from_cell(cell: &str) -> Self {
        let trimmed = cell.trim();
        if is_na_cell(trimmed) {
            return FeatureValue::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(v) => FeatureValue::Number(v),
            Err(_) => FeatureValue::Text(cell.to_string()),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, FeatureValue::Missing)
    }
}

/// Cell spellings that mean "no value" in exported tables
pub const NA_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// True for an empty cell or one of the [`NA_MARKERS`]
pub fn is_na_cell(cell: &str) -> bool {
    NA_MARKERS.contains(&cell.trim())
}

impl From<f64> for FeatureValue {
    fn from(v: f64) -> Self {
        FeatureValue::Number(v)
    }
}

impl From<i64> for FeatureValue {
    fn from(v: i64) -> Self {
        FeatureValue::Number(v as f64)
    }
}

impl From<bool> for FeatureValue {
    fn from(v: bool) -> Self {
        FeatureValue::Bool(v)
    }
}

impl From<&str> for FeatureValue {
    fn from(v: &str) -> Self {
        FeatureValue::Text(v.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(v: String) -> Self {
        FeatureValue::Text(v)
    }
}

// ============================================================================
// FEATURE RECORD
// ============================================================================

/// Ordered mapping from feature name to value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureRecord {
    entries: Vec<(String, FeatureValue)>,
}

impl FeatureRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value. A replaced key keeps its original position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FeatureValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Feature names in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for FeatureRecord
where
    K: Into<String>,
    V: Into<FeatureValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = FeatureRecord::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

impl Serialize for FeatureRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FeatureRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RecordVisitor;

        impl<'de> Visitor<'de> for RecordVisitor {
            type Value = FeatureRecord;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of feature name to value")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut record = FeatureRecord::new();
                while let Some((k, v)) = access.next_entry::<String, FeatureValue>()? {
                    record.insert(k, v);
                }
                Ok(record)
            }
        }

        deserializer.deserialize_map(RecordVisitor)
    }
}

// ============================================================================
// FEATURE INPUT
// ============================================================================

/// One record or a batch, as accepted by `predict_records`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureInput {
    Single(FeatureRecord),
    Batch(Vec<FeatureRecord>),
}

impl FeatureInput {
    pub fn into_records(self) -> Vec<FeatureRecord> {
        match self {
            FeatureInput::Single(record) => vec![record],
            FeatureInput::Batch(records) => records,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FeatureInput::Single(_) => 1,
            FeatureInput::Batch(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<FeatureRecord> for FeatureInput {
    fn from(record: FeatureRecord) -> Self {
        FeatureInput::Single(record)
    }
}

impl From<Vec<FeatureRecord>> for FeatureInput {
    fn from(records: Vec<FeatureRecord>) -> Self {
        FeatureInput::Batch(records)
    }
}
