//! Fixed-interval sweep scheduler.
//!
//! The first tick fires one interval after [`Scheduler::start`]. A tick that
//! lands while another sweep holds the coordinator's run lock is skipped.
//! [`Scheduler::stop`] waits for the loop to exit, so a sweep that is already
//! running always finishes.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info, warn};

use scimsync_reconcile::RunCoordinator;

use crate::metrics::MetricsRegistry;

/// Snapshot returned by `GET /scheduler/status`.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub interval_secs: u64,
    pub last_sync: Option<DateTime<Utc>>,
    pub next_sync: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Clone, Copy)]
struct Timeline {
    last_sync: Option<DateTime<Utc>>,
    next_sync: Option<DateTime<Utc>>,
}

struct LoopHandle {
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Drives [`RunCoordinator::run`] on a fixed cadence.
pub struct Scheduler {
    coordinator: Arc<RunCoordinator>,
    groups: Arc<[String]>,
    interval: Duration,
    metrics: Arc<MetricsRegistry>,
    timeline: Mutex<Timeline>,
    handle: tokio::sync::Mutex<Option<LoopHandle>>,
}

impl Scheduler {
    #[must_use]
    pub fn new(
        coordinator: Arc<RunCoordinator>,
        groups: Arc<[String]>,
        interval: Duration,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            coordinator,
            groups,
            interval,
            metrics,
            timeline: Mutex::new(Timeline::default()),
            handle: tokio::sync::Mutex::new(None),
        }
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawn the tick loop. Returns `false` when it is already running.
    pub async fn start(self: &Arc<Self>) -> bool {
        let mut handle = self.handle.lock().await;
        if handle.is_some() {
            return false;
        }

        let (cancel, cancelled) = watch::channel(false);
        self.timeline().next_sync = self.after_interval(Utc::now());
        let task = tokio::spawn(Arc::clone(self).tick_loop(cancelled));
        *handle = Some(LoopHandle { cancel, task });

        info!(interval_secs = self.interval.as_secs(), "Scheduler started");
        true
    }

    /// Stop the loop and wait for it to exit. Returns `false` when it was
    /// not running.
    pub async fn stop(&self) -> bool {
        let Some(LoopHandle { cancel, task }) = self.handle.lock().await.take() else {
            return false;
        };

        // The receiver is gone only if the loop already exited.
        let _ = cancel.send(true);
        if let Err(e) = task.await {
            error!(error = %e, "Scheduler task ended abnormally");
        }
        self.timeline().next_sync = None;

        info!("Scheduler stopped");
        true
    }

    pub async fn is_running(&self) -> bool {
        self.handle.lock().await.is_some()
    }

    pub async fn status(&self) -> SchedulerStatus {
        let running = self.is_running().await;
        let timeline = *self.timeline();
        SchedulerStatus {
            running,
            interval_secs: self.interval.as_secs(),
            last_sync: timeline.last_sync,
            next_sync: timeline.next_sync,
        }
    }

    async fn tick_loop(self: Arc<Self>, mut cancelled: watch::Receiver<bool>) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = cancelled.changed() => break,
            }
            // Not raced against cancellation: a started sweep runs to the end.
            self.tick().await;
        }
    }

    async fn tick(&self) {
        let started = Utc::now();
        info!("Scheduled sweep starting");

        match self.coordinator.run(&self.groups).await {
            Ok(report) => {
                self.metrics.record_report(&report);
                self.timeline().last_sync = Some(report.finished_at);
                if report.is_success() {
                    info!(run_id = %report.run_id, "Scheduled sweep completed");
                } else {
                    warn!(
                        run_id = %report.run_id,
                        errors = report.errors.len(),
                        "Scheduled sweep completed with errors"
                    );
                }
            }
            Err(e) if e.is_sweep_in_progress() => {
                self.metrics.record_rejected();
                warn!("Skipping scheduled sweep: another sweep is in progress");
            }
            Err(e) => error!(error = %e, "Scheduled sweep failed"),
        }

        // Missed ticks are delayed, so an overlong sweep is followed at once.
        let now = Utc::now();
        self.timeline().next_sync = self.after_interval(started).map(|next| next.max(now));
    }

    fn after_interval(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        chrono::Duration::from_std(self.interval)
            .ok()
            .and_then(|delta| from.checked_add_signed(delta))
    }

    fn timeline(&self) -> std::sync::MutexGuard<'_, Timeline> {
        self.timeline.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("interval", &self.interval)
            .field("groups", &self.groups)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scimsync_reconcile::testing::{FakeDownstream, FakeUpstream};
    use scimsync_reconcile::{
        EnrollmentGroup, MemberKind, MemberStatus, RetryPolicy, SyncOptions, UpstreamMember,
    };

    fn scheduler(upstream: Arc<FakeUpstream>, downstream: Arc<FakeDownstream>) -> Arc<Scheduler> {
        let mut options = SyncOptions::new(EnrollmentGroup::for_domain("co"));
        options.retry = RetryPolicy::none();
        let coordinator = Arc::new(RunCoordinator::new(upstream, downstream, options));
        Arc::new(Scheduler::new(
            coordinator,
            Arc::from(vec!["eng@co".to_string()]),
            Duration::from_secs(60),
            Arc::new(MetricsRegistry::new()),
        ))
    }

    fn fixture() -> (Arc<FakeUpstream>, Arc<FakeDownstream>) {
        let upstream = Arc::new(FakeUpstream::new());
        upstream.put_group(
            "eng@co",
            "Engineering",
            vec![UpstreamMember::new("alice@co", MemberKind::Person, MemberStatus::Active)],
        );
        (upstream, Arc::new(FakeDownstream::new()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_waits_one_interval() {
        let (upstream, downstream) = fixture();
        let scheduler = scheduler(upstream, downstream.clone());
        assert!(scheduler.start().await);

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(scheduler.metrics.snapshot().total_sweeps, 0);
        assert!(scheduler.status().await.last_sync.is_none());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(scheduler.metrics.snapshot().total_sweeps, 1);
        assert!(downstream.user("alice@co").is_some());

        let status = scheduler.status().await;
        assert!(status.running);
        assert!(status.last_sync.is_some());
        assert!(status.next_sync.is_some());

        assert!(scheduler.stop().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_repeat_until_stopped() {
        let (upstream, downstream) = fixture();
        let scheduler = scheduler(upstream, downstream);
        scheduler.start().await;

        tokio::time::sleep(Duration::from_secs(181)).await;
        assert_eq!(scheduler.metrics.snapshot().total_sweeps, 3);

        assert!(scheduler.stop().await);
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(scheduler.metrics.snapshot().total_sweeps, 3);

        let status = scheduler.status().await;
        assert!(!status.running);
        assert!(status.next_sync.is_none());
    }

    #[tokio::test]
    async fn test_start_and_stop_are_idempotent() {
        let (upstream, downstream) = fixture();
        let scheduler = scheduler(upstream, downstream);

        assert!(!scheduler.stop().await);
        assert!(scheduler.start().await);
        assert!(!scheduler.start().await);
        assert!(scheduler.is_running().await);
        assert!(scheduler.stop().await);
        assert!(!scheduler.is_running().await);
        assert_eq!(scheduler.status().await.interval_secs, 60);
    }
}
