//! Sweep metrics: Prometheus exposition and a JSON summary.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use chrono::{DateTime, Utc};
use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family, gauge::Gauge, histogram::Histogram},
    registry::Registry,
};
use serde::Serialize;

use scimsync_reconcile::{RunReport, RunStats};

/// Labels for the sweep counter.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct SweepLabels {
    /// `success` or `errors`.
    pub outcome: String,
    pub test_mode: String,
}

/// Registered metric families.
pub struct SweepMetrics {
    pub sweeps_total: Family<SweepLabels, Counter>,
    pub sweeps_rejected_total: Counter,
    pub groups_processed_total: Counter,
    pub groups_created_total: Counter,
    pub users_created_total: Counter,
    pub memberships_added_total: Counter,
    pub memberships_removed_total: Counter,
    pub sweep_errors_total: Counter,
    pub sweep_duration_seconds: Histogram,
    pub last_sweep_timestamp_seconds: Gauge,
}

impl SweepMetrics {
    fn new() -> Self {
        Self {
            sweeps_total: Family::default(),
            sweeps_rejected_total: Counter::default(),
            groups_processed_total: Counter::default(),
            groups_created_total: Counter::default(),
            users_created_total: Counter::default(),
            memberships_added_total: Counter::default(),
            memberships_removed_total: Counter::default(),
            sweep_errors_total: Counter::default(),
            // Sweeps run from seconds to tens of minutes with retries.
            sweep_duration_seconds: Histogram::new(
                [1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0].into_iter(),
            ),
            last_sweep_timestamp_seconds: Gauge::default(),
        }
    }
}

/// Running totals behind `GET /stats`.
#[derive(Debug, Default)]
struct SweepHistory {
    total_sweeps: u64,
    successful_sweeps: u64,
    failed_sweeps: u64,
    totals: RunStats,
    last_duration_ms: Option<i64>,
    total_duration_ms: i64,
    last_sweep_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

/// JSON summary of every sweep since startup.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub total_sweeps: u64,
    pub successful_sweeps: u64,
    pub failed_sweeps: u64,
    /// Percentage of sweeps without errors.
    pub success_rate: f64,
    #[serde(flatten)]
    pub totals: RunStats,
    pub last_duration_ms: Option<i64>,
    pub average_duration_ms: Option<i64>,
    pub last_sweep_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub uptime_secs: u64,
}

/// Owns the Prometheus registry and the sweep history.
pub struct MetricsRegistry {
    registry: Mutex<Registry>,
    pub sweeps: Arc<SweepMetrics>,
    history: Mutex<SweepHistory>,
    started: Instant,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MetricsRegistry {
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix("scimsync");
        let sweeps = Arc::new(SweepMetrics::new());

        registry.register("sweeps", "Completed sweeps by outcome", sweeps.sweeps_total.clone());
        registry.register(
            "sweeps_rejected",
            "Sweep requests rejected because one was already running",
            sweeps.sweeps_rejected_total.clone(),
        );
        registry.register(
            "groups_processed",
            "Upstream groups read",
            sweeps.groups_processed_total.clone(),
        );
        registry.register(
            "groups_created",
            "Downstream groups created",
            sweeps.groups_created_total.clone(),
        );
        registry.register(
            "users_created",
            "Downstream users created",
            sweeps.users_created_total.clone(),
        );
        registry.register(
            "memberships_added",
            "Memberships added across both directories",
            sweeps.memberships_added_total.clone(),
        );
        registry.register(
            "memberships_removed",
            "Memberships removed across both directories",
            sweeps.memberships_removed_total.clone(),
        );
        registry.register(
            "sweep_errors",
            "Errors recorded in sweep reports",
            sweeps.sweep_errors_total.clone(),
        );
        registry.register(
            "sweep_duration_seconds",
            "Sweep wall-clock duration",
            sweeps.sweep_duration_seconds.clone(),
        );
        registry.register(
            "last_sweep_timestamp_seconds",
            "Unix time the last sweep finished",
            sweeps.last_sweep_timestamp_seconds.clone(),
        );

        Self {
            registry: Mutex::new(registry),
            sweeps,
            history: Mutex::new(SweepHistory::default()),
            started: Instant::now(),
        }
    }

    /// Fold a finished sweep into both views.
    pub fn record_report(&self, report: &RunReport) {
        let m = &self.sweeps;
        let labels = SweepLabels {
            outcome: if report.is_success() { "success" } else { "errors" }.to_string(),
            test_mode: report.test_mode.to_string(),
        };
        m.sweeps_total.get_or_create(&labels).inc();
        m.groups_processed_total.inc_by(u64::from(report.stats.groups_processed));
        m.groups_created_total.inc_by(u64::from(report.stats.groups_created));
        m.users_created_total.inc_by(u64::from(report.stats.users_created));
        m.memberships_added_total.inc_by(u64::from(report.stats.memberships_added));
        m.memberships_removed_total.inc_by(u64::from(report.stats.memberships_removed));
        m.sweep_errors_total.inc_by(report.errors.len() as u64);

        let duration_ms = report.duration().num_milliseconds().max(0);
        m.sweep_duration_seconds.observe(duration_ms as f64 / 1000.0);
        m.last_sweep_timestamp_seconds.set(report.finished_at.timestamp());

        let mut history = lock(&self.history);
        history.total_sweeps += 1;
        if report.is_success() {
            history.successful_sweeps += 1;
            history.last_error = None;
        } else {
            history.failed_sweeps += 1;
            history.last_error = report.errors.first().map(ToString::to_string);
        }
        history.totals.merge(&report.stats);
        history.last_duration_ms = Some(duration_ms);
        history.total_duration_ms += duration_ms;
        history.last_sweep_at = Some(report.finished_at);
    }

    /// Count a sweep request turned away by the single-flight guard.
    pub fn record_rejected(&self) {
        self.sweeps.sweeps_rejected_total.inc();
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        let history = lock(&self.history);
        let success_rate = if history.total_sweeps == 0 {
            0.0
        } else {
            history.successful_sweeps as f64 / history.total_sweeps as f64 * 100.0
        };
        let average_duration_ms = i64::try_from(history.total_sweeps)
            .ok()
            .filter(|n| *n > 0)
            .map(|n| history.total_duration_ms / n);

        StatsSnapshot {
            total_sweeps: history.total_sweeps,
            successful_sweeps: history.successful_sweeps,
            failed_sweeps: history.failed_sweeps,
            success_rate,
            totals: history.totals,
            last_duration_ms: history.last_duration_ms,
            average_duration_ms,
            last_sweep_at: history.last_sweep_at,
            last_error: history.last_error.clone(),
            uptime_secs: self.started.elapsed().as_secs(),
        }
    }

    /// Prometheus text exposition.
    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut buf = String::new();
        prometheus_client::encoding::text::encode(&mut buf, &lock(&self.registry))?;
        Ok(buf)
    }
}
