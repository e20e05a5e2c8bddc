//! Upload handlers
//!
//! Uploads arrive as the raw request body (CSV text). The client-side file
//! name, when the client has one, comes in `?filename=` and decides which
//! reader applies.

use axum::{
    extract::{rejection::StringRejection, Query},
    Json,
};
use predict_core::ingest::{self, Table, TableStats};
use predict_core::{FeatureRecord, IngestError};
use serde::{Deserialize, Serialize};

use crate::{AppError, AppResult};

/// Rows returned in a preview
const SAMPLE_ROWS: usize = 5;

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub filename: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub message: &'static str,
    pub filename: Option<String>,
    pub columns: Vec<String>,
    pub stats: TableStats,
    pub sample_data: Vec<FeatureRecord>,
}

/// Parse an uploaded table and summarize it without predicting
pub async fn preview(
    Query(query): Query<UploadQuery>,
    body: Result<String, StringRejection>,
) -> AppResult<Json<PreviewResponse>> {
    let table = read_upload(query.filename.as_deref(), body?)?;

    tracing::info!(
        filename = ?query.filename,
        rows = table.n_rows(),
        columns = table.n_cols(),
        "Upload previewed"
    );

    Ok(Json(PreviewResponse {
        message: "File processed successfully",
        stats: table.stats(),
        sample_data: table.sample(SAMPLE_ROWS),
        columns: table.columns,
        filename: query.filename,
    }))
}

/// Check the file name, then parse and clean the body as CSV
pub(crate) fn read_upload(filename: Option<&str>, body: String) -> AppResult<Table> {
    if let Some(name) = filename {
        if !ingest::allowed_file(name) {
            return Err(AppError::BadRequest(
                "File type not allowed. Please upload a CSV file.".to_string(),
            ));
        }
        if let Some((_, ext)) = name.rsplit_once('.') {
            if !ext.eq_ignore_ascii_case("csv") {
                return Err(IngestError::UnsupportedFormat(format!(".{}", ext.to_ascii_lowercase())).into());
            }
        }
    }

    Ok(ingest::process_csv(&body)?)
}
