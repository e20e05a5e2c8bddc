//! Health check handler

use axum::{extract::State, Json};
use predict_core::StoreStatus;
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: i64,
    model: StoreStatus,
}

/// Liveness plus model state; a server without a model reports `degraded`
pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    let model = state.store.status();

    Json(HealthResponse {
        status: if model.model_loaded { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().timestamp(),
        model,
    })
}
