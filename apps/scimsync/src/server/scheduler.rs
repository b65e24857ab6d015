//! Scheduler control. Every route answers 400 when scheduling is disabled.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use super::AppState;
use crate::error::AppResult;
use crate::scheduler::SchedulerStatus;

#[derive(Debug, Serialize)]
struct ControlResponse {
    status: &'static str,
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/scheduler/start", post(start_handler))
        .route("/scheduler/stop", post(stop_handler))
        .route("/scheduler/status", get(status_handler))
}

async fn start_handler(State(state): State<AppState>) -> AppResult<Json<ControlResponse>> {
    let status = if state.scheduler()?.start().await {
        "started"
    } else {
        "already_running"
    };
    Ok(Json(ControlResponse { status }))
}

async fn stop_handler(State(state): State<AppState>) -> AppResult<Json<ControlResponse>> {
    let status = if state.scheduler()?.stop().await {
        "stopped"
    } else {
        "not_running"
    };
    Ok(Json(ControlResponse { status }))
}

async fn status_handler(State(state): State<AppState>) -> AppResult<Json<SchedulerStatus>> {
    Ok(Json(state.scheduler()?.status().await))
}
