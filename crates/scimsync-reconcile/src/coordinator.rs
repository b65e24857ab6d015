//! Run coordinator: one sweep across all configured groups.
//!
//! Groups are processed one at a time. A failure in one group is recorded
//! against its address and the sweep moves on. At most one sweep runs at a
//! time; a second caller gets [`SyncError::SweepInProgress`] immediately
//! instead of waiting.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::directory::{DownstreamDirectory, UpstreamDirectory};
use crate::engine::Reconciler;
use crate::enrollment::{EnrollmentGroup, EnrollmentSynchronizer};
use crate::error::{SyncError, SyncResult};
use crate::report::RunReport;
use crate::retry::RetryPolicy;

/// Behavioural settings for a coordinator.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Prepended to upstream display names to form downstream group names.
    pub group_prefix: String,
    /// Perform reads only; log the mutations that would happen.
    pub test_mode: bool,
    pub retry: RetryPolicy,
    pub enrollment_group: EnrollmentGroup,
    /// Re-check enrollment-group members not covered by any configured group.
    pub prune_enrollment_group: bool,
}

impl SyncOptions {
    /// Options with the standard prefix and retry policy.
    #[must_use]
    pub fn new(enrollment_group: EnrollmentGroup) -> Self {
        Self {
            group_prefix: "GoogleSCIM_".to_string(),
            test_mode: false,
            retry: RetryPolicy::default(),
            enrollment_group,
            prune_enrollment_group: true,
        }
    }
}

/// Sequences reconciliation and enrollment sync for every group.
pub struct RunCoordinator {
    upstream: Arc<dyn UpstreamDirectory>,
    reconciler: Reconciler,
    enrollment: EnrollmentSynchronizer,
    options: SyncOptions,
    run_lock: Mutex<()>,
}

impl RunCoordinator {
    /// Create a coordinator over the given directories.
    pub fn new(
        upstream: Arc<dyn UpstreamDirectory>,
        downstream: Arc<dyn DownstreamDirectory>,
        options: SyncOptions,
    ) -> Self {
        let reconciler = Reconciler::new(
            downstream.clone(),
            options.retry.clone(),
            options.group_prefix.clone(),
            options.test_mode,
        );
        let enrollment = EnrollmentSynchronizer::new(
            upstream.clone(),
            downstream,
            options.enrollment_group.clone(),
            options.retry.clone(),
            options.test_mode,
        );
        Self {
            upstream,
            reconciler,
            enrollment,
            options,
            run_lock: Mutex::new(()),
        }
    }

    /// The options this coordinator was built with.
    #[must_use]
    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Whether a sweep currently holds the run lock.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.run_lock.try_lock().is_err()
    }

    /// Run one sweep over `groups`.
    ///
    /// The only error is [`SyncError::SweepInProgress`]. Everything that goes
    /// wrong inside the sweep is reported in [`RunReport::errors`].
    pub async fn run(&self, groups: &[String]) -> SyncResult<RunReport> {
        let Ok(_guard) = self.run_lock.try_lock() else {
            warn!("Sweep requested while another is in progress");
            return Err(SyncError::SweepInProgress);
        };
        Ok(self.sweep(groups).await)
    }

    #[instrument(skip_all, fields(groups = groups.len(), test_mode = self.options.test_mode))]
    async fn sweep(&self, groups: &[String]) -> RunReport {
        let mut report = RunReport::begin(self.options.test_mode);
        info!(run_id = %report.run_id, "Starting sweep");

        let mut seen = HashSet::new();
        for address in groups {
            self.sync_group(address, &mut report, &mut seen).await;
        }

        if self.options.prune_enrollment_group {
            let pruned = self.enrollment.prune_unseen(&seen).await;
            report.stats.merge(&pruned.stats);
            report.record_errors(&self.options.enrollment_group.address, pruned.errors);
        }

        report.finish();
        info!(
            run_id = %report.run_id,
            groups_processed = report.stats.groups_processed,
            groups_created = report.stats.groups_created,
            users_created = report.stats.users_created,
            memberships_added = report.stats.memberships_added,
            memberships_removed = report.stats.memberships_removed,
            errors = report.errors.len(),
            duration_ms = report.duration().num_milliseconds(),
            "Sweep finished"
        );
        report
    }

    async fn sync_group(&self, address: &str, report: &mut RunReport, seen: &mut HashSet<String>) {
        let retry = &self.options.retry;

        let group = match retry
            .execute("get_group", || self.upstream.get_group(address))
            .await
        {
            Ok(group) => group,
            Err(source) => {
                warn!(group = address, error = %source, "Skipping group: upstream read failed");
                report.record_errors(address, [SyncError::UpstreamGroup(source)]);
                return;
            }
        };

        let members = match retry
            .execute("get_group_members", || self.upstream.get_group_members(address))
            .await
        {
            Ok(members) => members,
            Err(source) => {
                warn!(group = address, error = %source, "Skipping group: member listing failed");
                report.record_errors(address, [SyncError::UpstreamMembers(source)]);
                return;
            }
        };
        info!(group = address, members = members.len(), "Read upstream group");

        let outcome = self.reconciler.reconcile(&group, &members).await;
        report.stats.merge(&outcome.stats);
        report.record_errors(address, outcome.errors);
        if !outcome.completed {
            return;
        }

        // Members of a covered group are never pruned, eligible or not.
        seen.extend(members.iter().map(|member| member.address.to_lowercase()));

        let enrollment = self.enrollment.sync_members(&members).await;
        report.stats.merge(&enrollment.stats);
        report.record_errors(address, enrollment.errors);
    }
}

impl std::fmt::Debug for RunCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunCoordinator")
            .field("options", &self.options)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}
