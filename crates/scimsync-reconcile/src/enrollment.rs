//! Mirrors downstream passkey enrollment into an upstream group.
//!
//! A member is "enrolled" when their downstream user is active and holds an
//! active passkey. The enrollment group gains enrolled members and loses
//! members that are no longer enrolled. Lookup failures skip the member for
//! this sweep; they never remove anyone.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::directory::{DownstreamDirectory, UpstreamDirectory};
use crate::error::{DirectoryResult, SyncError};
use crate::retry::RetryPolicy;
use crate::stats::RunStats;
use crate::types::{MemberKind, UpstreamMember};

/// The upstream group that tracks enrolled users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentGroup {
    pub address: String,
    pub display_name: String,
    pub description: String,
}

impl EnrollmentGroup {
    /// Default enrollment group for a domain.
    #[must_use]
    pub fn for_domain(domain: &str) -> Self {
        Self {
            address: format!("byid-enrolled@{domain}"),
            display_name: "BYID Enrolled".to_string(),
            description: "Users with an active Beyond Identity passkey".to_string(),
        }
    }
}

/// Result of one enrollment pass.
#[derive(Debug, Clone, Default)]
pub struct EnrollmentOutcome {
    /// Only the membership counters move here.
    pub stats: RunStats,
    pub errors: Vec<SyncError>,
    /// Lower-cased addresses whose status was looked up (or attempted).
    pub evaluated: HashSet<String>,
    /// Addresses skipped because the lookup failed.
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Change {
    Add,
    Remove,
}

/// Keeps the enrollment group aligned with downstream enrollment state.
pub struct EnrollmentSynchronizer {
    upstream: Arc<dyn UpstreamDirectory>,
    downstream: Arc<dyn DownstreamDirectory>,
    group: EnrollmentGroup,
    retry: RetryPolicy,
    test_mode: bool,
}

impl EnrollmentSynchronizer {
    /// Create a new synchronizer.
    pub fn new(
        upstream: Arc<dyn UpstreamDirectory>,
        downstream: Arc<dyn DownstreamDirectory>,
        group: EnrollmentGroup,
        retry: RetryPolicy,
        test_mode: bool,
    ) -> Self {
        Self {
            upstream,
            downstream,
            group,
            retry,
            test_mode,
        }
    }

    /// The group being maintained.
    #[must_use]
    pub fn group(&self) -> &EnrollmentGroup {
        &self.group
    }

    /// Update enrollment membership for the eligible members of one group.
    #[instrument(skip_all, fields(enrollment_group = %self.group.address))]
    pub async fn sync_members(&self, members: &[UpstreamMember]) -> EnrollmentOutcome {
        let mut outcome = EnrollmentOutcome::default();

        let mut current = match self.current_members().await {
            Ok(current) => current,
            Err(error) => {
                outcome.errors.push(error);
                return outcome;
            }
        };

        for member in members.iter().filter(|m| m.is_eligible()) {
            let key = member.address.to_lowercase();
            if !outcome.evaluated.insert(key.clone()) {
                continue;
            }

            let Some(enrolled) = self.lookup(&member.address, &mut outcome).await else {
                continue;
            };

            let change = match (enrolled, current.contains(&key)) {
                (true, false) => Change::Add,
                (false, true) => Change::Remove,
                _ => continue,
            };
            if self.apply(&member.address, change, &mut outcome).await {
                match change {
                    Change::Add => current.insert(key),
                    Change::Remove => current.remove(&key),
                };
            }
        }

        outcome
    }

    /// Re-check enrollment-group members that no configured group covered
    /// this sweep, removing the ones no longer enrolled.
    #[instrument(skip_all, fields(enrollment_group = %self.group.address))]
    pub async fn prune_unseen(&self, seen: &HashSet<String>) -> EnrollmentOutcome {
        let mut outcome = EnrollmentOutcome::default();

        let members = match self.read_members().await {
            Ok(Some(members)) => members,
            Ok(None) => return outcome,
            Err(error) => {
                outcome.errors.push(error);
                return outcome;
            }
        };

        for member in members {
            if member.kind != MemberKind::Person {
                continue;
            }
            let key = member.address.to_lowercase();
            if seen.contains(&key) || !outcome.evaluated.insert(key) {
                continue;
            }
            if let Some(false) = self.lookup(&member.address, &mut outcome).await {
                self.apply(&member.address, Change::Remove, &mut outcome).await;
            }
        }

        outcome
    }

    /// Current member addresses (lower-cased), creating the group if needed.
    /// In test mode a missing group is reported and treated as empty.
    async fn current_members(&self) -> Result<HashSet<String>, SyncError> {
        if !self.test_mode {
            let group = &self.group;
            self.retry
                .execute("ensure_enrollment_group", || {
                    self.upstream
                        .ensure_group(&group.address, &group.display_name, &group.description)
                })
                .await
                .map_err(|source| self.group_error(source))?;
        }

        let members = self.read_members().await?.unwrap_or_default();
        Ok(members
            .into_iter()
            .map(|member| member.address.to_lowercase())
            .collect())
    }

    /// `None` when the group does not exist (only possible in test mode).
    async fn read_members(&self) -> Result<Option<Vec<UpstreamMember>>, SyncError> {
        let address = self.group.address.as_str();
        if self.test_mode {
            match self
                .retry
                .execute("get_enrollment_group", || self.upstream.get_group(address))
                .await
            {
                Ok(_) => {}
                Err(error) if error.is_not_found() => {
                    info!(address, "[test mode] Would create enrollment group");
                    return Ok(None);
                }
                Err(source) => return Err(self.group_error(source)),
            }
        }

        self.retry
            .execute("get_enrollment_group_members", || {
                self.upstream.get_group_members(address)
            })
            .await
            .map(Some)
            .map_err(|source| self.group_error(source))
    }

    async fn lookup(&self, address: &str, outcome: &mut EnrollmentOutcome) -> Option<bool> {
        let result: DirectoryResult<bool> = self
            .retry
            .execute("is_enrolled", || self.downstream.is_enrolled(address))
            .await;
        match result {
            Ok(enrolled) => {
                debug!(address, enrolled, "Enrollment status");
                Some(enrolled)
            }
            Err(error) => {
                warn!(address, error = %error, "Enrollment lookup failed, skipping member");
                outcome.skipped.push(address.to_string());
                None
            }
        }
    }

    /// Returns true when the change was applied.
    async fn apply(&self, address: &str, change: Change, outcome: &mut EnrollmentOutcome) -> bool {
        let group = self.group.address.as_str();

        if self.test_mode {
            match change {
                Change::Add => info!(group, address, "[test mode] Would add to enrollment group"),
                Change::Remove => {
                    info!(group, address, "[test mode] Would remove from enrollment group");
                }
            }
            return false;
        }

        let result = match change {
            Change::Add => {
                self.retry
                    .execute("add_enrollment_member", || self.upstream.add_member(group, address))
                    .await
            }
            Change::Remove => {
                self.retry
                    .execute("remove_enrollment_member", || {
                        self.upstream.remove_member(group, address)
                    })
                    .await
            }
        };

        match result {
            Ok(()) => {
                match change {
                    Change::Add => {
                        outcome.stats.memberships_added += 1;
                        info!(group, address, "Added to enrollment group");
                    }
                    Change::Remove => {
                        outcome.stats.memberships_removed += 1;
                        info!(group, address, "Removed from enrollment group");
                    }
                }
                true
            }
            Err(source) => {
                warn!(group, address, error = %source, "Failed to update enrollment group");
                outcome.errors.push(SyncError::EnrollmentUpdate {
                    address: address.to_string(),
                    source,
                });
                false
            }
        }
    }

    fn group_error(&self, source: crate::DirectoryError) -> SyncError {
        SyncError::EnrollmentGroup {
            address: self.group.address.clone(),
            source,
        }
    }
}

impl std::fmt::Debug for EnrollmentSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrollmentSynchronizer")
            .field("group", &self.group)
            .field("retry", &self.retry)
            .field("test_mode", &self.test_mode)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_group_for_domain() {
        let group = EnrollmentGroup::for_domain("example.com");
        assert_eq!(group.address, "byid-enrolled@example.com");
        assert_eq!(group.display_name, "BYID Enrolled");
    }
}
