//! Upload summary statistics

use std::collections::BTreeMap;

use serde::Serialize;

use super::Table;
use crate::features::is_na_cell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Numeric,
    Text,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericStats {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation, absent with fewer than two values
    pub std: Option<f64>,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableStats {
    pub rows: usize,
    pub columns: usize,
    pub column_types: BTreeMap<String, ColumnType>,
    pub missing_values: BTreeMap<String, usize>,
    pub numeric_stats: BTreeMap<String, NumericStats>,
}

pub(super) fn compute(table: &Table) -> TableStats {
    let mut column_types = BTreeMap::new();
    let mut missing_values = BTreeMap::new();
    let mut numeric_stats = BTreeMap::new();

    for (j, name) in table.columns.iter().enumerate() {
        let cells: Vec<&str> = table
            .rows
            .iter()
            .map(|row| row[j].trim())
            .filter(|cell| !is_na_cell(cell))
            .collect();
        missing_values.insert(name.clone(), table.rows.len() - cells.len());

        if cells.is_empty() {
            column_types.insert(name.clone(), ColumnType::Empty);
            continue;
        }

        let numbers: Option<Vec<f64>> = cells.iter().map(|c| c.parse::<f64>().ok()).collect();
        match numbers {
            Some(values) => {
                column_types.insert(name.clone(), ColumnType::Numeric);
                numeric_stats.insert(name.clone(), describe(&values));
            }
            None => {
                column_types.insert(name.clone(), ColumnType::Text);
            }
        }
    }

    TableStats {
        rows: table.rows.len(),
        columns: table.columns.len(),
        column_types,
        missing_values,
        numeric_stats,
    }
}

fn describe(values: &[f64]) -> NumericStats {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let std = if values.len() > 1 {
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        Some(variance.sqrt())
    } else {
        None
    };

    NumericStats {
        count: values.len(),
        mean,
        std,
        min: values.iter().cloned().fold(f64::INFINITY, f64::min),
        max: values.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
    }
}
