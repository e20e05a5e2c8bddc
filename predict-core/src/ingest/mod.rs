//! Ingest Module - uploaded tables → feature records
//!
//! An upload goes through: extension check → CSV parse → cleaning
//! (drop all-empty rows, forward-fill gaps) → one `FeatureRecord` per row.
//! The prediction pipeline never reads files itself; it only sees records.

pub mod csv;
pub mod stats;

use std::path::Path;

use tracing::{debug, error};

use crate::error::IngestError;
use crate::features::{is_na_cell, FeatureRecord, FeatureValue};

pub use self::csv::parse_csv;
pub use stats::{ColumnType, NumericStats, TableStats};

/// Extensions accepted for upload
pub const ALLOWED_EXTENSIONS: &[&str] = &["csv", "xlsx", "xls"];

/// True if the file name carries an accepted extension
pub fn allowed_file(filename: &str) -> bool {
    match filename.rsplit_once('.') {
        Some((_, ext)) => ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()),
        None => false,
    }
}

// ============================================================================
// TABLE
// ============================================================================

/// Header + string cells, every row as wide as the header
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// Drop rows with no values at all, then fill each empty cell from the
    /// nearest non-empty cell above it in the same column. NA markers such as
    /// `NaN` or `null` count as empty. Leading gaps stay as they are.
    pub fn clean(&mut self) {
        let before = self.rows.len();
        self.rows
            .retain(|row| row.iter().any(|cell| !is_na_cell(cell)));

        for j in 0..self.columns.len() {
            let mut last: Option<String> = None;
            for row in &mut self.rows {
                if is_na_cell(&row[j]) {
                    if let Some(prev) = &last {
                        row[j] = prev.clone();
                    }
                } else {
                    last = Some(row[j].clone());
                }
            }
        }

        debug!(dropped = before - self.rows.len(), rows = self.rows.len(), "Table cleaned");
    }

    /// One record per row, keys in header order
    pub fn records(&self) -> Vec<FeatureRecord> {
        self.rows.iter().map(|row| self.row_record(row)).collect()
    }

    /// First `n` rows as records
    pub fn sample(&self, n: usize) -> Vec<FeatureRecord> {
        self.rows.iter().take(n).map(|row| self.row_record(row)).collect()
    }

    pub fn stats(&self) -> TableStats {
        stats::compute(self)
    }

    fn row_record(&self, row: &[String]) -> FeatureRecord {
        self.columns
            .iter()
            .zip(row)
            .map(|(name, cell)| (name.as_str(), FeatureValue::from_cell(cell)))
            .collect()
    }
}

// ============================================================================
// ENTRY POINTS
// ============================================================================

/// Parse and clean CSV text
pub fn process_csv(text: &str) -> Result<Table, IngestError> {
    let mut table = parse_csv(text)?;
    table.clean();
    Ok(table)
}

/// Read an uploaded file by extension, then parse and clean it
pub fn read_table<P: AsRef<Path>>(path: P) -> Result<Table, IngestError> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let result = match ext.as_str() {
        "csv" => std::fs::read_to_string(path)
            .map_err(|source| IngestError::Io {
                path: path.to_path_buf(),
                source,
            })
            .and_then(|text| process_csv(&text)),
        // Accepted for upload, but there is no spreadsheet reader
        "xlsx" | "xls" => Err(IngestError::UnsupportedFormat(format!(".{}", ext))),
        other => Err(IngestError::UnsupportedFormat(format!(".{}", other))),
    };

    if let Err(e) = &result {
        error!(path = %path.display(), error = %e, "Error processing file");
    }
    result
}
