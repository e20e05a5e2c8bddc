//! Error handling

use axum::{
    extract::rejection::{JsonRejection, StringRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use predict_core::{IngestError, PredictError};
use serde_json::{json, Map, Value};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    // Prediction pipeline errors
    Predict(PredictError),

    // Upload errors
    Ingest(IngestError),

    // Request shape errors
    BadRequest(String),

    // Extractor rejections keep their own status (400, 413, 415, 422)
    Rejected { status: StatusCode, message: String },
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Predict(e) => match e {
                PredictError::NotInitialized => StatusCode::SERVICE_UNAVAILABLE,
                PredictError::EmptyBatch => StatusCode::BAD_REQUEST,
                PredictError::MissingFeatures { .. }
                | PredictError::InconsistentSchema { .. }
                | PredictError::Preprocessing { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                PredictError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Ingest(e) => match e {
                IngestError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                IngestError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                _ => StatusCode::BAD_REQUEST,
            },
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Rejected { status, .. } => *status,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AppError::Predict(e) => e.kind(),
            AppError::Ingest(e) => e.kind(),
            AppError::BadRequest(_) => "bad_request",
            AppError::Rejected { .. } => "invalid_request_body",
        }
    }

    /// Structured fields callers can act on
    fn context(&self) -> Map<String, Value> {
        let mut context = Map::new();
        match self {
            AppError::Predict(PredictError::MissingFeatures { record, missing }) => {
                context.insert("record".into(), json!(record));
                context.insert("missing".into(), json!(missing));
            }
            AppError::Predict(PredictError::InconsistentSchema { record, expected, found }) => {
                context.insert("record".into(), json!(record));
                context.insert("expected".into(), json!(expected));
                context.insert("found".into(), json!(found));
            }
            AppError::Predict(PredictError::Preprocessing { column, .. }) => {
                context.insert("column".into(), json!(column));
            }
            AppError::Ingest(IngestError::RaggedRow { line, .. }) => {
                context.insert("line".into(), json!(line));
            }
            _ => {}
        }
        context
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match &self {
            AppError::Predict(e @ PredictError::Inference(_)) => {
                tracing::error!("Inference error: {}", e);
                "Inference failed".to_string()
            }
            AppError::Ingest(e @ IngestError::Io { .. }) => {
                tracing::error!("Upload read error: {}", e);
                "Failed to read uploaded file".to_string()
            }
            AppError::Predict(e) => e.to_string(),
            AppError::Ingest(e) => e.to_string(),
            AppError::BadRequest(msg) => msg.clone(),
            AppError::Rejected { message, .. } => message.clone(),
        };

        let mut body = self.context();
        body.insert("error".into(), json!(message));
        body.insert("kind".into(), json!(self.kind()));
        body.insert("status".into(), json!(status.as_u16()));

        (status, Json(Value::Object(body))).into_response()
    }
}

impl From<PredictError> for AppError {
    fn from(err: PredictError) -> Self {
        AppError::Predict(err)
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        AppError::Ingest(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<StringRejection> for AppError {
    fn from(rejection: StringRejection) -> Self {
        AppError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}
