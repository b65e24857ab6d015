//! SCIM client error types.

use scimsync_reconcile::DirectoryError;
use thiserror::Error;

/// Errors raised while talking to the downstream directory.
#[derive(Debug, Error)]
pub enum ScimClientError {
    /// 404 from the target.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// 409 from the target.
    #[error("Resource already exists: {0}")]
    Conflict(String),

    /// 429 from the target.
    #[error("Rate limited (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    /// 401 or 403 from the target.
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// Any other non-success status.
    #[error("SCIM error (status {status}): {detail}")]
    ScimError { status: u16, detail: String },

    /// The request timed out.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The target could not be reached.
    #[error("Target unreachable: {0}")]
    Unreachable(String),

    /// A response body could not be decoded.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// The client was configured incorrectly.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ScimClientError {
    /// Network failures and throttling.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Timeout(_) | Self::Unreachable(_)
        )
    }

    /// 5xx responses.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::ScimError { status, .. } if *status >= 500)
    }
}

impl From<reqwest::Error> for ScimClientError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else if error.is_builder() {
            Self::InvalidConfig(error.to_string())
        } else {
            Self::Unreachable(error.to_string())
        }
    }
}

impl From<serde_json::Error> for ScimClientError {
    fn from(error: serde_json::Error) -> Self {
        Self::ParseError(error.to_string())
    }
}

impl From<ScimClientError> for DirectoryError {
    fn from(error: ScimClientError) -> Self {
        match error {
            ScimClientError::NotFound(detail) => DirectoryError::not_found("resource", detail),
            ScimClientError::Conflict(detail) => DirectoryError::Conflict(detail),
            ScimClientError::RateLimited { retry_after_secs } => {
                DirectoryError::RateLimited { retry_after_secs }
            }
            ScimClientError::AuthError(detail) => DirectoryError::Auth(detail),
            ScimClientError::ScimError { status, detail } => DirectoryError::Api { status, detail },
            ScimClientError::Timeout(detail) | ScimClientError::Unreachable(detail) => {
                DirectoryError::Transport(detail)
            }
            ScimClientError::ParseError(detail) => DirectoryError::InvalidResponse(detail),
            ScimClientError::InvalidConfig(detail) => DirectoryError::Configuration(detail),
        }
    }
}

/// Result type for SCIM client operations.
pub type ScimClientResult<T> = Result<T, ScimClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        assert!(ScimClientError::Timeout("30s".into()).is_retryable());
        assert!(ScimClientError::RateLimited { retry_after_secs: Some(2) }.is_retryable());
        assert!(!ScimClientError::NotFound("user".into()).is_retryable());
        assert!(ScimClientError::ScimError { status: 502, detail: "bad gateway".into() }.is_server_error());
        assert!(!ScimClientError::ScimError { status: 400, detail: "bad".into() }.is_server_error());
    }

    #[test]
    fn test_conversion_keeps_transience() {
        let transient: DirectoryError = ScimClientError::Unreachable("dns".into()).into();
        assert!(transient.is_transient());

        let server: DirectoryError =
            ScimClientError::ScimError { status: 503, detail: "down".into() }.into();
        assert!(server.is_transient());

        let conflict: DirectoryError = ScimClientError::Conflict("exists".into()).into();
        assert!(conflict.is_conflict());

        let limited: DirectoryError =
            ScimClientError::RateLimited { retry_after_secs: Some(7) }.into();
        assert_eq!(limited.retry_after_secs(), Some(7));
    }
}
