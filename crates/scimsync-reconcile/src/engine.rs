//! Reconciliation engine: one upstream group onto one downstream group.
//!
//! Provisions missing downstream users for eligible upstream members and
//! patches the downstream group so its membership matches exactly. Existing
//! users are reused as found; attribute drift on them (display name, active
//! flag) is not corrected.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::directory::DownstreamDirectory;
use crate::error::{DirectoryResult, SyncError};
use crate::naming::display_name_from_address;
use crate::retry::RetryPolicy;
use crate::stats::RunStats;
use crate::types::{NewDownstreamUser, UpstreamGroup, UpstreamMember};

/// Group id reported in test mode when the group would have been created.
pub const TEST_GROUP_ID: &str = "test-group-id";

/// Prefix of user ids reported in test mode for would-be users.
pub const TEST_USER_ID_PREFIX: &str = "test-user-id:";

/// Result of reconciling a single group.
#[derive(Debug, Clone, Default)]
pub struct ReconcileOutcome {
    pub stats: RunStats,
    /// Per-user failures, plus at most one group-level failure.
    pub errors: Vec<SyncError>,
    /// False when a group-level failure aborted the reconciliation.
    pub completed: bool,
    /// Downstream group id, or [`TEST_GROUP_ID`] for a would-be group.
    pub group_id: Option<String>,
    /// Member ids added (or that would be added in test mode).
    pub to_add: Vec<String>,
    /// Member ids removed (or that would be removed in test mode).
    pub to_remove: Vec<String>,
}

impl ReconcileOutcome {
    fn abort(mut self, error: SyncError) -> Self {
        self.errors.push(error);
        self.completed = false;
        self
    }
}

struct Ensured {
    id: String,
    created: bool,
    placeholder: bool,
}

/// Computes and applies the downstream changes for a group.
pub struct Reconciler {
    downstream: Arc<dyn DownstreamDirectory>,
    retry: RetryPolicy,
    group_prefix: String,
    test_mode: bool,
}

impl Reconciler {
    /// Create a new reconciler.
    pub fn new(
        downstream: Arc<dyn DownstreamDirectory>,
        retry: RetryPolicy,
        group_prefix: impl Into<String>,
        test_mode: bool,
    ) -> Self {
        Self {
            downstream,
            retry,
            group_prefix: group_prefix.into(),
            test_mode,
        }
    }

    /// Downstream display name for an upstream group.
    #[must_use]
    pub fn downstream_group_name(&self, group: &UpstreamGroup) -> String {
        let base = if group.display_name.trim().is_empty() {
            group.address.as_str()
        } else {
            group.display_name.as_str()
        };
        format!("{}{}", self.group_prefix, base)
    }

    /// Reconcile one group. Never fails outright: problems land in
    /// [`ReconcileOutcome::errors`].
    #[instrument(skip_all, fields(group = %group.address, test_mode = self.test_mode))]
    pub async fn reconcile(
        &self,
        group: &UpstreamGroup,
        members: &[UpstreamMember],
    ) -> ReconcileOutcome {
        let mut outcome = ReconcileOutcome::default();

        // 1. Ensure the downstream group. The upstream description has no
        // downstream counterpart and is dropped.
        let display_name = self.downstream_group_name(group);
        let ensured_group = match self.ensure_group(&display_name).await {
            Ok(ensured) => ensured,
            Err(source) => {
                warn!(display_name = %display_name, error = %source, "Failed to ensure downstream group");
                return outcome.abort(SyncError::DownstreamGroup {
                    display_name,
                    source,
                });
            }
        };
        if ensured_group.created {
            outcome.stats.groups_created += 1;
        }
        outcome.group_id = Some(ensured_group.id.clone());

        // 2-3. Ensure a user per eligible member and collect the desired set.
        let mut desired = BTreeSet::new();
        for member in members {
            if !member.is_eligible() {
                debug!(member = %member.address, kind = ?member.kind, status = ?member.status, "Skipping ineligible member");
                continue;
            }
            match self.ensure_user(&member.address).await {
                Ok(user) => {
                    if user.created {
                        outcome.stats.users_created += 1;
                    }
                    desired.insert(user.id);
                }
                Err(source) => {
                    warn!(member = %member.address, error = %source, "Failed to ensure downstream user, excluding from group");
                    outcome.errors.push(SyncError::User {
                        address: member.address.clone(),
                        source,
                    });
                }
            }
        }

        // 4. Current membership. A would-be group has none.
        let current: BTreeSet<String> = if ensured_group.placeholder {
            BTreeSet::new()
        } else {
            let group_id = ensured_group.id.as_str();
            match self
                .retry
                .execute("get_group_members", || self.downstream.get_group_members(group_id))
                .await
            {
                Ok(ids) => ids.into_iter().collect(),
                Err(source) => {
                    warn!(group_id, error = %source, "Failed to read downstream membership");
                    return outcome.abort(SyncError::Membership {
                        group_id: group_id.to_string(),
                        source,
                    });
                }
            }
        };

        // 5. Diff.
        let to_add: Vec<String> = desired.difference(&current).cloned().collect();
        let to_remove: Vec<String> = current.difference(&desired).cloned().collect();
        outcome.to_add.clone_from(&to_add);
        outcome.to_remove.clone_from(&to_remove);

        // 6. Patch.
        if to_add.is_empty() && to_remove.is_empty() {
            debug!(members = desired.len(), "Downstream group already in sync");
        } else if self.test_mode {
            info!(
                group_id = %ensured_group.id,
                to_add = ?to_add,
                to_remove = ?to_remove,
                "[test mode] Would patch downstream group membership"
            );
        } else {
            let group_id = ensured_group.id.as_str();
            let patched = self
                .retry
                .execute("patch_group_members", || {
                    self.downstream
                        .patch_group_members(group_id, &to_add, &to_remove)
                })
                .await;
            if let Err(source) = patched {
                warn!(group_id, error = %source, "Failed to patch downstream group");
                return outcome.abort(SyncError::Patch {
                    group_id: group_id.to_string(),
                    source,
                });
            }
            outcome.stats.memberships_added += to_add.len() as u32;
            outcome.stats.memberships_removed += to_remove.len() as u32;
            info!(
                group_id,
                added = to_add.len(),
                removed = to_remove.len(),
                "Patched downstream group membership"
            );
        }

        // 7. Done.
        outcome.stats.groups_processed += 1;
        outcome.completed = true;
        outcome
    }

    async fn ensure_group(&self, display_name: &str) -> DirectoryResult<Ensured> {
        if let Some(existing) = self.find_group(display_name).await? {
            debug!(group_id = %existing, "Reusing downstream group");
            return Ok(Ensured {
                id: existing,
                created: false,
                placeholder: false,
            });
        }

        if self.test_mode {
            info!(display_name, "[test mode] Would create downstream group");
            return Ok(Ensured {
                id: TEST_GROUP_ID.to_string(),
                created: false,
                placeholder: true,
            });
        }

        match self
            .retry
            .execute("create_group", || self.downstream.create_group(display_name))
            .await
        {
            Ok(group) => {
                info!(display_name, group_id = %group.id, "Created downstream group");
                Ok(Ensured {
                    id: group.id,
                    created: true,
                    placeholder: false,
                })
            }
            // Somebody else created it between our search and create.
            Err(error) if error.is_conflict() => match self.find_group(display_name).await? {
                Some(id) => Ok(Ensured {
                    id,
                    created: false,
                    placeholder: false,
                }),
                None => Err(error),
            },
            Err(error) => Err(error),
        }
    }

    async fn find_group(&self, display_name: &str) -> DirectoryResult<Option<String>> {
        let found = self
            .retry
            .execute("find_group_by_display_name", || {
                self.downstream.find_group_by_display_name(display_name)
            })
            .await?;
        Ok(found.map(|group| group.id))
    }

    async fn ensure_user(&self, address: &str) -> DirectoryResult<Ensured> {
        if let Some(existing) = self.find_user(address).await? {
            return Ok(Ensured {
                id: existing,
                created: false,
                placeholder: false,
            });
        }

        if self.test_mode {
            info!(address, "[test mode] Would create downstream user");
            return Ok(Ensured {
                id: format!("{TEST_USER_ID_PREFIX}{address}"),
                created: false,
                placeholder: true,
            });
        }

        let new_user = NewDownstreamUser {
            external_id: address.to_string(),
            address: address.to_string(),
            display_name: display_name_from_address(address),
        };
        match self
            .retry
            .execute("create_user", || self.downstream.create_user(&new_user))
            .await
        {
            Ok(user) => {
                info!(address, user_id = %user.id, "Created downstream user");
                Ok(Ensured {
                    id: user.id,
                    created: true,
                    placeholder: false,
                })
            }
            Err(error) if error.is_conflict() => match self.find_user(address).await? {
                Some(id) => Ok(Ensured {
                    id,
                    created: false,
                    placeholder: false,
                }),
                None => Err(error),
            },
            Err(error) => Err(error),
        }
    }

    async fn find_user(&self, address: &str) -> DirectoryResult<Option<String>> {
        let found = self
            .retry
            .execute("find_user_by_address", || self.downstream.find_user_by_address(address))
            .await?;
        Ok(found.map(|user| user.id))
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("retry", &self.retry)
            .field("group_prefix", &self.group_prefix)
            .field("test_mode", &self.test_mode)
            .finish_non_exhaustive()
    }
}
