//! Counters accumulated over a sweep.

use serde::{Deserialize, Serialize};

/// Mutation counters for a group, or a whole sweep after merging.
///
/// Test-mode runs only ever move `groups_processed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    #[serde(default)]
    pub groups_processed: u32,
    #[serde(default)]
    pub groups_created: u32,
    #[serde(default)]
    pub users_created: u32,
    #[serde(default)]
    pub memberships_added: u32,
    #[serde(default)]
    pub memberships_removed: u32,
}

impl RunStats {
    /// Create new empty statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge with another statistics instance.
    pub fn merge(&mut self, other: &RunStats) {
        self.groups_processed += other.groups_processed;
        self.groups_created += other.groups_created;
        self.users_created += other.users_created;
        self.memberships_added += other.memberships_added;
        self.memberships_removed += other.memberships_removed;
    }

    /// Total number of mutations applied.
    #[must_use]
    pub fn total_changes(&self) -> u32 {
        self.groups_created + self.users_created + self.memberships_added + self.memberships_removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge() {
        let mut total = RunStats {
            groups_processed: 1,
            users_created: 2,
            memberships_added: 2,
            ..RunStats::default()
        };
        let other = RunStats {
            groups_processed: 1,
            groups_created: 1,
            memberships_removed: 3,
            ..RunStats::default()
        };

        total.merge(&other);

        assert_eq!(total.groups_processed, 2);
        assert_eq!(total.groups_created, 1);
        assert_eq!(total.users_created, 2);
        assert_eq!(total.memberships_added, 2);
        assert_eq!(total.memberships_removed, 3);
        assert_eq!(total.total_changes(), 8);
    }
}
