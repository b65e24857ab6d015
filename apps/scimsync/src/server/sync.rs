//! `POST /sync`: run one sweep and return its report.

use axum::{extract::State, routing::post, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use scimsync_reconcile::RunReport;

use super::AppState;
use crate::error::{AppError, AppResult};

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    /// `success` or `completed_with_errors`.
    pub status: &'static str,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub report: RunReport,
}

pub(super) fn routes() -> Router<AppState> {
    Router::new().route("/sync", post(sync_handler))
}

async fn sync_handler(State(state): State<AppState>) -> AppResult<Json<SyncResponse>> {
    info!("Sweep requested over HTTP");

    // Detached so a dropped connection cannot cut a sweep short.
    let sweep = {
        let state = state.clone();
        tokio::spawn(async move {
            let result = state.coordinator.run(&state.groups).await;
            match &result {
                Ok(report) => state.metrics.record_report(report),
                Err(e) if e.is_sweep_in_progress() => state.metrics.record_rejected(),
                Err(_) => {}
            }
            result
        })
    };
    let report = sweep
        .await
        .map_err(|e| AppError::Internal(format!("sweep task failed: {e}")))??;

    let (status, message) = if report.is_success() {
        ("success", "Sweep completed successfully".to_string())
    } else {
        warn!(errors = report.errors.len(), "HTTP sweep completed with errors");
        (
            "completed_with_errors",
            format!("Sweep completed with {} error(s)", report.errors.len()),
        )
    };

    Ok(Json(SyncResponse {
        status,
        message,
        timestamp: Utc::now(),
        report,
    }))
}
