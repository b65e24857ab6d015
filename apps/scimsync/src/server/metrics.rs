//! `GET /metrics` (Prometheus text) and `GET /stats` (JSON).

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use super::AppState;
use crate::error::{AppError, AppResult};
use crate::metrics::StatsSnapshot;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/stats", get(stats_handler))
}

async fn metrics_handler(State(state): State<AppState>) -> AppResult<Response> {
    let output = state
        .metrics
        .encode()
        .map_err(|e| AppError::Internal(format!("failed to encode metrics: {e}")))?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )
        .body(Body::from(output))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()))
}

async fn stats_handler(State(state): State<AppState>) -> Json<StatsSnapshot> {
    Json(state.metrics.snapshot())
}
