//! HTTP routes and handlers

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{info, warn};

use crate::state::AppState;
use logsift_cascade::batch;

/// Upper bound on uploaded CSV bodies
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/v1/classify", post(classify))
        .route("/v1/classify/file", post(classify_file))
        .fallback(fallback)
        .layer(axum::extract::DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn metrics(State(state): State<AppState>) -> String {
    state.metrics.render()
}

async fn fallback() -> &'static str {
    "Not found"
}

/// Single-message classification request
#[derive(Debug, Deserialize)]
struct ClassifyRequest {
    source: String,
    message: String,
}

/// Single-message classification response
#[derive(Debug, Serialize)]
struct ClassifyResponse {
    label: String,
    producer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    confidence: Option<f32>,
    latency_us: u64,
}

async fn classify(
    State(state): State<AppState>,
    Json(req): Json<ClassifyRequest>,
) -> Result<Json<ClassifyResponse>, AppError> {
    metrics::counter!("logsift_requests_total", "endpoint" => "classify").increment(1);

    let result = state.router.classify(&req.source, &req.message).await?;

    Ok(Json(ClassifyResponse {
        label: result.category.label().to_string(),
        producer: result.producer.label().to_string(),
        confidence: result.confidence,
        latency_us: result.latency_us,
    }))
}

/// CSV batch classification.
///
/// The request body is the raw table; the response body is the same table
/// with the `label` column appended. Row counts and row-level failures are
/// surfaced in response headers so callers keep the CSV body clean.
async fn classify_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    metrics::counter!("logsift_requests_total", "endpoint" => "classify_file").increment(1);

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !content_type.starts_with("text/csv") {
        return Err(AppError::UnsupportedMediaType(content_type.to_string()));
    }

    let output = batch::classify_csv(&state.router, &body).await?;

    if !output.report.failures.is_empty() {
        warn!(
            failed = output.report.failures.len(),
            rows = output.report.rows,
            "batch completed with row failures"
        );
    } else {
        info!(rows = output.report.rows, "batch completed");
    }

    let mut response = Response::new(axum::body::Body::from(output.csv));
    let response_headers = response.headers_mut();
    response_headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/csv; charset=utf-8"),
    );
    response_headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_static("attachment; filename=\"classified.csv\""),
    );
    response_headers.insert(
        "x-logsift-rows",
        HeaderValue::from_str(&output.report.rows.to_string())
            .map_err(|e| AppError::Internal(e.to_string()))?,
    );
    response_headers.insert(
        "x-logsift-row-failures",
        HeaderValue::from_str(&output.report.failures.len().to_string())
            .map_err(|e| AppError::Internal(e.to_string()))?,
    );

    Ok(response)
}

/// Error handling
#[derive(Debug)]
pub enum AppError {
    InvalidInput(String),
    ServiceUnavailable(String),
    UnsupportedMediaType(String),
    Internal(String),
}

impl From<logsift_core::Error> for AppError {
    fn from(err: logsift_core::Error) -> Self {
        match err {
            logsift_core::Error::InvalidInput(msg) => AppError::InvalidInput(msg),
            logsift_core::Error::ServiceUnavailable(msg) => AppError::ServiceUnavailable(msg),
            logsift_core::Error::Timeout => {
                AppError::ServiceUnavailable("operation timed out".to_string())
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::UnsupportedMediaType(got) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                format!("expected text/csv, got '{}'", got),
            ),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        metrics::counter!("logsift_errors_total", "status" => status.as_u16().to_string())
            .increment(1);

        let body = json!({
            "error": {
                "message": message,
            }
        });

        (status, Json(body)).into_response()
    }
}
