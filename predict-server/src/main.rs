//! Tabular Prediction Server
//!
//! HTTP front end for a single pre-trained classifier.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    PREDICT SERVER                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌───────────────┐  ┌─────────────────────┐ │
//! │  │  API      │  │  Upload       │  │  Model Store        │ │
//! │  │  (Axum)   │──│  (CSV ingest) │──│  (loaded once)      │ │
//! │  └───────────┘  └───────────────┘  └──────────┬──────────┘ │
//! │                                               ▼             │
//! │                                   ┌─────────────────────┐  │
//! │                                   │ validate → scale →  │  │
//! │                                   │ classify            │  │
//! │                                   └─────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod handlers;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use predict_core::ModelStore;
use tower_http::{compression::CompressionLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration (.env first so RUST_LOG can live there too)
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "predict_server=debug,predict_core=info,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if config.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!(environment = %config.environment, "Prediction server starting...");
    if config.is_production() && config.allow_legacy_model {
        tracing::warn!("Legacy model artifacts are enabled in production");
    }

    // Load the model once, before accepting traffic
    let store = Arc::new(ModelStore::new(config.load_options()));
    match store.initialize(&config.model_path) {
        Ok(()) => tracing::info!(model = ?store.model_info().ok().map(|i| i.model_type), "Model ready"),
        Err(e) if config.require_model => {
            return Err(e).with_context(|| format!("failed to load model from {}", config.model_path.display()));
        }
        Err(e) => tracing::warn!("Serving without a model: {}", e),
    }

    // Build application state
    let state = AppState {
        store,
        config: config.clone(),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ModelStore>,
    pub config: config::Config,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    let predict_routes = Router::new()
        .route("/api/predict/model-info", get(handlers::predict::model_info))
        .route("/api/predict/predict", post(handlers::predict::predict))
        .route("/api/predict/batch-predict", post(handlers::predict::batch_predict))
        .route("/api/predict/file", post(handlers::predict::predict_file));

    let upload_routes = Router::new().route("/api/upload/preview", post(handlers::upload::preview));

    let max_content_length = state.config.max_content_length;

    // Combine all routes
    Router::new()
        .route("/health", get(handlers::health::check))
        .merge(predict_routes)
        .merge(upload_routes)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_content_length))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
