//! Router tests: requests go through the full layer stack via `oneshot`

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use predict_core::model::loader;
use predict_core::{LoadOptions, ModelStore};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::config::Config;
use crate::{create_router, AppState};

/// `1 if a + b > 0 else 0`
const RULE_ARTIFACT: &str = r#"{
    "classifier": {"kind": "linear_rule", "weights": [1.0, 1.0]},
    "scaler": {"kind": "identity"},
    "feature_names": ["a", "b"]
}"#;

/// Single stump on `a`, probabilities 0.9 / 0.1 either side of 0
const TREE_ARTIFACT: &str = r#"{
    "classifier": {
        "kind": "decision_tree",
        "classes": ["no", "yes"],
        "n_features": 2,
        "children_left": [1, -1, -1],
        "children_right": [2, -1, -1],
        "feature": [0, -2, -2],
        "threshold": [0.0, -2.0, -2.0],
        "value": [[10, 10], [9, 1], [1, 9]]
    },
    "feature_names": ["a", "b"]
}"#;

fn app_with(artifact: &str, config: Config) -> Router {
    let artifact = loader::from_json_str(artifact, &LoadOptions::default()).unwrap();
    create_router(AppState {
        store: Arc::new(ModelStore::from_artifact(artifact)),
        config,
    })
}

fn app() -> Router {
    app_with(RULE_ARTIFACT, Config::default())
}

fn empty_app() -> Router {
    create_router(AppState {
        store: Arc::new(ModelStore::new(LoadOptions::default())),
        config: Config::default(),
    })
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_csv(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "text/csv")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_health_reports_model() {
    let (status, body) = send(app(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model"]["model_loaded"], true);
    assert_eq!(body["model"]["model_name"], "linear_rule");

    let (_, body) = send(empty_app(), get("/health")).await;
    assert_eq!(body["status"], "degraded");
}

#[tokio::test]
async fn test_model_info() {
    let (status, body) = send(app(), get("/api/predict/model-info")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model_type"], "linear_rule");
    assert_eq!(body["features"], json!(["a", "b"]));
    assert_eq!(body["probabilistic"], false);
}

#[tokio::test]
async fn test_predict_single() {
    let (status, body) = send(
        app(),
        post_json("/api/predict/predict", json!({"features": {"b": 1.0, "a": 1.0}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prediction"], json!([1]));
    assert_eq!(body["confidence"], Value::Null);
}

#[tokio::test]
async fn test_predict_with_probabilities() {
    let app = app_with(TREE_ARTIFACT, Config::default());
    let (status, body) = send(
        app,
        post_json("/api/predict/predict", json!({"features": {"a": 2.0, "b": 0.0}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prediction"], json!(["yes"]));
    assert_eq!(body["classes"], json!(["no", "yes"]));
    assert!((body["confidence"].as_f64().unwrap() - 0.9).abs() < 1e-9);
}

#[tokio::test]
async fn test_predict_missing_feature() {
    let (status, body) = send(
        app(),
        post_json("/api/predict/predict", json!({"features": {"a": 1.0}})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "missing_features");
    assert_eq!(body["missing"], json!(["b"]));
    assert_eq!(body["status"], 422);
}

#[tokio::test]
async fn test_predict_without_features_key() {
    let (status, body) = send(app(), post_json("/api/predict/predict", json!({"rows": []}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No features provided");
}

#[tokio::test]
async fn test_predict_malformed_json() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/predict/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"features\": "))
        .unwrap();
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_request_body");
}

#[tokio::test]
async fn test_batch_predict() {
    let payload = json!({"features_list": [
        {"a": 1.0, "b": 1.0},
        {"b": -3.0, "a": 1.0},
        {"a": "2.5", "b": 0, "extra": "ignored"}
    ]});
    let (status, body) = send(app(), post_json("/api/predict/batch-predict", payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["predictions"], json!([1, 0, 1]));
    assert_eq!(body["count"], 3);
}

#[tokio::test]
async fn test_batch_predict_empty_and_partial() {
    let (status, body) = send(
        app(),
        post_json("/api/predict/batch-predict", json!({"features_list": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "empty_batch");

    let payload = json!({"features_list": [{"a": 1, "b": 1}, {"a": 1}]});
    let (status, body) = send(app(), post_json("/api/predict/batch-predict", payload)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["record"], 1);
}

#[tokio::test]
async fn test_not_initialized() {
    let (status, body) = send(
        empty_app(),
        post_json("/api/predict/predict", json!({"features": {"a": 1, "b": 1}})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["kind"], "predictor_not_initialized");

    let (status, _) = send(empty_app(), get("/api/predict/model-info")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_upload_preview() {
    let csv = "a,b,label\n1,2,x\n,,\n3,,y\n";
    let (status, body) = send(app(), post_csv("/api/upload/preview?filename=data.csv", csv)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["filename"], "data.csv");
    assert_eq!(body["columns"], json!(["a", "b", "label"]));
    assert_eq!(body["stats"]["rows"], 2);
    assert_eq!(body["stats"]["column_types"]["a"], "numeric");
    // Forward-filled from the row above
    assert_eq!(body["sample_data"][1]["b"], 2.0);
}

#[tokio::test]
async fn test_upload_rejects_file_types() {
    let (status, body) = send(app(), post_csv("/api/upload/preview?filename=notes.txt", "a\n1\n")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "bad_request");

    let (status, body) = send(app(), post_csv("/api/upload/preview?filename=book.XLSX", "a\n1\n")).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["kind"], "unsupported_format");

    let (status, body) = send(app(), post_csv("/api/upload/preview", "")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "empty_table");
}

#[tokio::test]
async fn test_predict_file() {
    let csv = "b,a\n1,1\n-5,2\n";
    let (status, body) = send(app(), post_csv("/api/predict/file?filename=batch.csv", csv)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["predictions"], json!([1, 0]));
    assert_eq!(body["count"], 2);
    assert_eq!(body["filename"], "batch.csv");
}

#[tokio::test]
async fn test_predict_file_non_numeric_cell() {
    let csv = "a,b\n1,high\n";
    let (status, body) = send(app(), post_csv("/api/predict/file", csv)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "preprocessing_error");
    assert_eq!(body["column"], "b");
}

#[tokio::test]
async fn test_predict_non_finite_value() {
    let (status, body) = send(
        app(),
        post_json("/api/predict/predict", json!({"features": {"a": "inf", "b": 1.0}})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "preprocessing_error");
    assert_eq!(body["column"], "a");
}

#[tokio::test]
async fn test_predict_file_na_markers_forward_filled() {
    let csv = "a,b\n1,2\nNaN,-5\n3,null\n";
    let (status, body) = send(app(), post_csv("/api/predict/file", csv)).await;
    assert_eq!(status, StatusCode::OK);
    // Row 2 takes a=1 from above, row 3 takes b=-5
    assert_eq!(body["predictions"], json!([1, 0, 0]));
}

#[tokio::test]
async fn test_body_limit() {
    let config = Config {
        max_content_length: 16,
        ..Config::default()
    };
    let body = json!({"features": {"a": 1.0, "b": 1.0}}).to_string();
    let request = Request::builder()
        .method("POST")
        .uri("/api/predict/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .unwrap();

    let (status, _) = send(app_with(RULE_ARTIFACT, config), request).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}
