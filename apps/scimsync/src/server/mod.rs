//! HTTP front-end: on-demand sweeps, health, metrics and scheduler control.

mod health;
mod metrics;
mod scheduler;
mod sync;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use tokio::signal;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use scimsync_reconcile::RunCoordinator;

use crate::error::{AppError, AppResult};
use crate::metrics::MetricsRegistry;
use crate::scheduler::Scheduler;

pub use health::{HealthResponse, SchedulerHealth};
pub use sync::SyncResponse;

/// Shared state for every handler.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<RunCoordinator>,
    pub groups: Arc<[String]>,
    pub metrics: Arc<MetricsRegistry>,
    /// `None` when scheduling is disabled in the configuration.
    pub scheduler: Option<Arc<Scheduler>>,
    pub started_at: Instant,
    pub version: &'static str,
}

impl AppState {
    #[must_use]
    pub fn new(
        coordinator: Arc<RunCoordinator>,
        groups: Arc<[String]>,
        metrics: Arc<MetricsRegistry>,
        scheduler: Option<Arc<Scheduler>>,
    ) -> Self {
        Self {
            coordinator,
            groups,
            metrics,
            scheduler,
            started_at: Instant::now(),
            version: crate::VERSION,
        }
    }

    fn scheduler(&self) -> AppResult<&Arc<Scheduler>> {
        self.scheduler.as_ref().ok_or(AppError::SchedulerNotConfigured)
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(sync::routes())
        .merge(metrics::routes())
        .merge(scheduler::routes())
        .with_state(state)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// Bind, serve until a shutdown signal, then stop the scheduler.
///
/// The scheduler is started here when present so that its first tick is
/// one interval after the listener is up.
pub async fn serve(addr: SocketAddr, state: AppState) -> AppResult<()> {
    let scheduler = state.scheduler.clone();
    if let Some(scheduler) = &scheduler {
        scheduler.start().await;
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, groups = state.groups.len(), "Listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(scheduler) = scheduler {
        // Waits for a scheduled sweep that is still running.
        scheduler.stop().await;
    }
    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
