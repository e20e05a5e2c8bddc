//! Prediction handlers

use axum::{
    extract::{
        rejection::{JsonRejection, StringRejection},
        Query, State,
    },
    Json,
};
use predict_core::{ClassLabel, FeatureRecord, ModelInfo, PredictionResult};
use serde::{Deserialize, Serialize};

use super::upload::{read_upload, UploadQuery};
use crate::{AppError, AppResult, AppState};

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub features: Option<FeatureRecord>,
}

#[derive(Debug, Deserialize)]
pub struct BatchPredictRequest {
    pub features_list: Option<Vec<FeatureRecord>>,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub prediction: Vec<ClassLabel>,
    /// Highest class probability, probabilistic models only
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<Vec<Vec<f64>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<ClassLabel>>,
}

#[derive(Debug, Serialize)]
pub struct BatchPredictResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub predictions: Vec<ClassLabel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<Vec<Vec<f64>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<ClassLabel>>,
    pub count: usize,
}

impl BatchPredictResponse {
    fn new(result: PredictionResult, filename: Option<String>) -> Self {
        Self {
            filename,
            count: result.len(),
            predictions: result.labels,
            probabilities: result.probabilities,
            classes: result.classes,
        }
    }
}

/// Describe the loaded model
pub async fn model_info(State(state): State<AppState>) -> AppResult<Json<ModelInfo>> {
    Ok(Json(state.store.model_info()?))
}

/// Predict a single record
pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> AppResult<Json<PredictResponse>> {
    let Json(request) = payload?;
    let features = request
        .features
        .ok_or_else(|| AppError::BadRequest("No features provided".to_string()))?;

    let result = state.store.predict_records(features)?;

    let confidence = result
        .probabilities
        .as_ref()
        .and_then(|rows| rows.first())
        .map(|row| row.iter().cloned().fold(f64::NEG_INFINITY, f64::max));

    Ok(Json(PredictResponse {
        prediction: result.labels,
        confidence,
        probabilities: result.probabilities,
        classes: result.classes,
    }))
}

/// Predict a list of records in one call; one bad record fails the batch
pub async fn batch_predict(
    State(state): State<AppState>,
    payload: Result<Json<BatchPredictRequest>, JsonRejection>,
) -> AppResult<Json<BatchPredictResponse>> {
    let Json(request) = payload?;
    let records = request
        .features_list
        .ok_or_else(|| AppError::BadRequest("No features list provided".to_string()))?;

    let result = state.store.predict_records(records)?;
    tracing::info!(count = result.len(), "Batch prediction served");

    Ok(Json(BatchPredictResponse::new(result, None)))
}

/// Predict every row of an uploaded CSV table
pub async fn predict_file(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    body: Result<String, StringRejection>,
) -> AppResult<Json<BatchPredictResponse>> {
    let table = read_upload(query.filename.as_deref(), body?)?;
    let result = state.store.predict_records(table.records())?;

    tracing::info!(filename = ?query.filename, count = result.len(), "File prediction served");

    Ok(Json(BatchPredictResponse::new(result, query.filename)))
}
