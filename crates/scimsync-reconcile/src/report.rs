//! The run report: the only externally observable result of a sweep.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::error::SyncError;
use crate::stats::RunStats;

/// A failure tagged with the group address it belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct GroupError {
    pub group: String,
    #[serde(rename = "message", serialize_with = "serialize_display")]
    pub error: SyncError,
}

impl GroupError {
    /// Tag an error with its group.
    pub fn new(group: impl Into<String>, error: SyncError) -> Self {
        Self {
            group: group.into(),
            error,
        }
    }
}

impl std::fmt::Display for GroupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.group, self.error)
    }
}

fn serialize_display<S: Serializer>(error: &SyncError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// Aggregate counts and errors for one sweep.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub test_mode: bool,
    #[serde(flatten)]
    pub stats: RunStats,
    pub errors: Vec<GroupError>,
}

impl RunReport {
    /// Start an empty report.
    #[must_use]
    pub fn begin(test_mode: bool) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            started_at: now,
            finished_at: now,
            test_mode,
            stats: RunStats::default(),
            errors: Vec::new(),
        }
    }

    /// Stamp the finish time.
    pub fn finish(&mut self) {
        self.finished_at = Utc::now();
    }

    /// Record errors for a group.
    pub fn record_errors(&mut self, group: &str, errors: impl IntoIterator<Item = SyncError>) {
        self.errors
            .extend(errors.into_iter().map(|error| GroupError::new(group, error)));
    }

    /// True when no errors were recorded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Wall-clock duration of the sweep.
    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
