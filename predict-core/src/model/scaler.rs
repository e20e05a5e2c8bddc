//! Feature Scalers - fitted transforms applied before inference
//!
//! Statistics come from training and are stored in the artifact.
//! Inference only ever calls `transform`; nothing here refits.

use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::PredictError;

/// Minimum range/scale, avoids division by zero on constant columns
const MIN_SCALE: f64 = 1e-8;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scaler {
    /// Pass-through, used for the legacy bare-classifier format
    #[default]
    Identity,

    /// `(x - mean) / scale`
    Standard { mean: Vec<f64>, scale: Vec<f64> },

    /// `(x - data_min) / (data_max - data_min)`
    MinMax { data_min: Vec<f64>, data_max: Vec<f64> },
}

impl Scaler {
    pub fn kind(&self) -> &'static str {
        match self {
            Scaler::Identity => "identity",
            Scaler::Standard { .. } => "standard",
            Scaler::MinMax { .. } => "min_max",
        }
    }

    /// Number of columns the scaler was fitted on (None for identity)
    pub fn n_features(&self) -> Option<usize> {
        match self {
            Scaler::Identity => None,
            Scaler::Standard { mean, .. } => Some(mean.len()),
            Scaler::MinMax { data_min, .. } => Some(data_min.len()),
        }
    }

    /// Check the fitted parameters agree with each other
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Scaler::Identity => Ok(()),
            Scaler::Standard { mean, scale } => {
                if mean.len() != scale.len() {
                    return Err(format!(
                        "standard scaler has {} means but {} scales",
                        mean.len(),
                        scale.len()
                    ));
                }
                Ok(())
            }
            Scaler::MinMax { data_min, data_max } => {
                if data_min.len() != data_max.len() {
                    return Err(format!(
                        "min_max scaler has {} minimums but {} maximums",
                        data_min.len(),
                        data_max.len()
                    ));
                }
                Ok(())
            }
        }
    }

    /// Apply the fitted transform column by column
    pub fn transform(
        &self,
        mut matrix: Array2<f64>,
        columns: &[String],
    ) -> Result<Array2<f64>, PredictError> {
        if let Some(expected) = self.n_features() {
            let found = matrix.ncols();
            if found != expected {
                let column = columns
                    .get(expected.min(found))
                    .cloned()
                    .unwrap_or_else(|| "*".to_string());
                return Err(PredictError::Preprocessing {
                    column,
                    reason: format!(
                        "scaler fitted on {} columns but received {}",
                        expected, found
                    ),
                });
            }
        }

        match self {
            Scaler::Identity => {}
            Scaler::Standard { mean, scale } => {
                for (j, mut col) in matrix.axis_iter_mut(Axis(1)).enumerate() {
                    let s = if scale[j].abs() < MIN_SCALE { 1.0 } else { scale[j] };
                    col.mapv_inplace(|x| (x - mean[j]) / s);
                }
            }
            Scaler::MinMax { data_min, data_max } => {
                for (j, mut col) in matrix.axis_iter_mut(Axis(1)).enumerate() {
                    let range = (data_max[j] - data_min[j]).max(MIN_SCALE);
                    col.mapv_inplace(|x| (x - data_min[j]) / range);
                }
            }
        }

        Ok(matrix)
    }
}
