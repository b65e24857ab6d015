//! `GET /health` and `GET /version`.

use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::AppState;
use crate::scheduler::SchedulerStatus;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
    pub uptime_secs: u64,
    pub sweep_in_progress: bool,
    pub scheduler: SchedulerHealth,
}

#[derive(Debug, Serialize)]
pub struct SchedulerHealth {
    pub enabled: bool,
    #[serde(flatten)]
    pub status: Option<SchedulerStatus>,
}

#[derive(Debug, Serialize)]
struct VersionResponse {
    version: &'static str,
    mode: &'static str,
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let scheduler = match &state.scheduler {
        Some(scheduler) => SchedulerHealth {
            enabled: true,
            status: Some(scheduler.status().await),
        },
        None => SchedulerHealth {
            enabled: false,
            status: None,
        },
    };

    Json(HealthResponse {
        status: "healthy",
        version: state.version,
        timestamp: Utc::now(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        sweep_in_progress: state.coordinator.is_running(),
        scheduler,
    })
}

async fn version_handler(State(state): State<AppState>) -> Json<VersionResponse> {
    Json(VersionResponse {
        version: state.version,
        mode: "server",
    })
}
