//! Error types for directory access and reconciliation.

use thiserror::Error;

/// Errors returned by directory adapters.
#[derive(Debug, Clone, Error)]
pub enum DirectoryError {
    /// The addressed resource does not exist.
    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },

    /// The resource already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The remote API asked us to slow down.
    #[error("Rate limited (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Connection, DNS or timeout failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Credentials rejected or could not be obtained.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Any other non-success API response.
    #[error("API error (status {status}): {detail}")]
    Api { status: u16, detail: String },

    /// The response body could not be understood.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The adapter itself is misconfigured (bad URL, unreadable key).
    #[error("Adapter configuration error: {0}")]
    Configuration(String),

    /// A retried operation failed on every attempt.
    #[error("{operation} failed after {attempts} attempt(s): {source}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        #[source]
        source: Box<DirectoryError>,
    },
}

impl DirectoryError {
    /// Create a not found error.
    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Network failures, throttling and server-side errors.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::RateLimited { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Check if this error means the resource is absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::RetriesExhausted { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error indicates the resource already exists.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Server-provided back-off hint, if any.
    #[must_use]
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after_secs } => *retry_after_secs,
            _ => None,
        }
    }
}

/// Result type for directory adapter calls.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Failures recorded while reconciling a group.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    /// Reading the upstream group failed (including "group not found").
    #[error("Failed to read upstream group: {0}")]
    UpstreamGroup(#[source] DirectoryError),

    /// Listing upstream members failed.
    #[error("Failed to list upstream members: {0}")]
    UpstreamMembers(#[source] DirectoryError),

    /// Finding or creating the downstream group failed.
    #[error("Failed to ensure downstream group '{display_name}': {source}")]
    DownstreamGroup {
        display_name: String,
        #[source]
        source: DirectoryError,
    },

    /// Finding or creating a downstream user failed.
    #[error("Failed to ensure downstream user {address}: {source}")]
    User {
        address: String,
        #[source]
        source: DirectoryError,
    },

    /// Reading the downstream group's members failed.
    #[error("Failed to read members of downstream group {group_id}: {source}")]
    Membership {
        group_id: String,
        #[source]
        source: DirectoryError,
    },

    /// Applying the membership patch failed.
    #[error("Failed to patch downstream group {group_id}: {source}")]
    Patch {
        group_id: String,
        #[source]
        source: DirectoryError,
    },

    /// Creating or reading the upstream enrollment group failed.
    #[error("Failed to prepare enrollment group {address}: {source}")]
    EnrollmentGroup {
        address: String,
        #[source]
        source: DirectoryError,
    },

    /// Adding or removing an enrollment-group member failed.
    #[error("Failed to update enrollment membership for {address}: {source}")]
    EnrollmentUpdate {
        address: String,
        #[source]
        source: DirectoryError,
    },

    /// Another sweep holds the run lock.
    #[error("Sweep already in progress")]
    SweepInProgress,
}

impl SyncError {
    /// Check if this error was caused by the run lock.
    #[must_use]
    pub fn is_sweep_in_progress(&self) -> bool {
        matches!(self, Self::SweepInProgress)
    }
}

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;
