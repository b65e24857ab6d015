//! Workspace adapter error types.

use scimsync_reconcile::DirectoryError;
use thiserror::Error;

/// Errors raised while talking to the Admin SDK.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Resource already exists: {0}")]
    Conflict(String),

    #[error("Rate limited (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    /// 401/403 from the API, or a failed token exchange.
    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Admin SDK error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Admin SDK unreachable: {0}")]
    Unreachable(String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Member listing kept returning page tokens.
    #[error("Members of {group} still paging after {max_pages} pages")]
    PageLimitExceeded { group: String, max_pages: u32 },

    /// Unreadable or malformed service-account key.
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl WorkspaceError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<reqwest::Error> for WorkspaceError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::Unreachable(error.to_string())
        }
    }
}

impl From<WorkspaceError> for DirectoryError {
    fn from(error: WorkspaceError) -> Self {
        match error {
            WorkspaceError::NotFound(id) => DirectoryError::not_found("group", id),
            WorkspaceError::Conflict(detail) => DirectoryError::Conflict(detail),
            WorkspaceError::RateLimited { retry_after_secs } => {
                DirectoryError::RateLimited { retry_after_secs }
            }
            WorkspaceError::AuthError(detail) => DirectoryError::Auth(detail),
            WorkspaceError::ApiError { status, message } => DirectoryError::Api {
                status,
                detail: message,
            },
            WorkspaceError::Timeout(detail) | WorkspaceError::Unreachable(detail) => {
                DirectoryError::Transport(detail)
            }
            WorkspaceError::ParseError(detail) => DirectoryError::InvalidResponse(detail),
            error @ WorkspaceError::PageLimitExceeded { .. } => {
                DirectoryError::InvalidResponse(error.to_string())
            }
            WorkspaceError::InvalidCredentials(detail) | WorkspaceError::InvalidConfig(detail) => {
                DirectoryError::Configuration(detail)
            }
        }
    }
}

/// Result type for workspace adapter operations.
pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_keeps_identity() {
        let error: DirectoryError = WorkspaceError::NotFound("eng@co".into()).into();
        assert!(error.is_not_found());
        assert!(error.to_string().contains("eng@co"));
    }

    #[test]
    fn test_transience_survives_conversion() {
        let timeout: DirectoryError = WorkspaceError::Timeout("30s".into()).into();
        assert!(timeout.is_transient());

        let quota: DirectoryError = WorkspaceError::ApiError {
            status: 503,
            message: "backend error".into(),
        }
        .into();
        assert!(quota.is_transient());

        let bad_key: DirectoryError = WorkspaceError::InvalidCredentials("pem".into()).into();
        assert!(!bad_key.is_transient());
    }
}
