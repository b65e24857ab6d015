//! Application errors: CLI exit codes and HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use scimsync_reconcile::{DirectoryError, SyncError};

use crate::config::ValidationIssue;

/// Exit codes:
/// - 0: success
/// - 1: sweep finished with errors, or a runtime failure
/// - 2: configuration error
pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration ({} problem(s)):\n{}", .0.len(), format_issues(.0))]
    Validation(Vec<ValidationIssue>),

    #[error("Failed to initialize {component}: {source}")]
    Init {
        component: &'static str,
        #[source]
        source: DirectoryError,
    },

    #[error("Sweep already in progress")]
    SweepInProgress,

    #[error("Scheduler not configured")]
    SchedulerNotConfigured,

    #[error("Sweep failed: {0}")]
    Sync(SyncError),

    #[error("Sweep completed with {0} error(s)")]
    SweepErrors(usize),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} diagnostic check(s) failed")]
    ChecksFailed(usize),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn format_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("  - {issue}"))
        .collect::<Vec<_>>()
        .join("\n")
}

impl From<SyncError> for AppError {
    fn from(error: SyncError) -> Self {
        if error.is_sweep_in_progress() {
            Self::SweepInProgress
        } else {
            Self::Sync(error)
        }
    }
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl AppError {
    /// Process exit code for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Config(_) | AppError::Validation(_) | AppError::Init { .. } => 2,
            AppError::SchedulerNotConfigured => 2,
            AppError::SweepInProgress
            | AppError::Sync(_)
            | AppError::SweepErrors(_)
            | AppError::Io(_)
            | AppError::ChecksFailed(_)
            | AppError::Internal(_) => 1,
        }
    }

    /// Machine-readable code for the response body.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config_error",
            AppError::Validation(_) => "invalid_config",
            AppError::Init { .. } => "init_error",
            AppError::SweepInProgress => "sweep_in_progress",
            AppError::SchedulerNotConfigured => "scheduler_not_configured",
            AppError::Sync(_) => "sync_error",
            AppError::SweepErrors(_) => "sweep_errors",
            AppError::Io(_) => "io_error",
            AppError::ChecksFailed(_) => "checks_failed",
            AppError::Internal(_) => "internal_error",
        }
    }

    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::SweepInProgress => StatusCode::CONFLICT,
            AppError::SchedulerNotConfigured => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl AppError {
    /// Print to stderr, colored unless `NO_COLOR` is set.
    pub fn print(&self) {
        let use_color = std::env::var("NO_COLOR").is_err();
        if use_color {
            eprintln!("\x1b[31mError:\x1b[0m {self}");
        } else {
            eprintln!("Error: {self}");
        }

        if let Some(suggestion) = self.suggestion() {
            if use_color {
                eprintln!("\n\x1b[33mSuggestion:\x1b[0m {suggestion}");
            } else {
                eprintln!("\nSuggestion: {suggestion}");
            }
        }
    }

    fn suggestion(&self) -> Option<&'static str> {
        match self {
            AppError::Config(_) => {
                Some("Pass --config <path> or create config.yaml in the working directory")
            }
            AppError::Validation(_) => Some("Run `scimsync validate-config` after fixing the file"),
            AppError::Init { .. } => Some("Run `scimsync check` to diagnose connectivity"),
            AppError::SweepErrors(_) => Some("See the log output for per-group failures"),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.error_code().to_string(),
            message: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(AppError::Config("x".into()).exit_code(), 2);
        assert_eq!(AppError::Validation(vec![]).exit_code(), 2);
        assert_eq!(AppError::SweepErrors(3).exit_code(), 1);
        assert_eq!(AppError::SweepInProgress.exit_code(), 1);
    }

    #[test]
    fn test_sweep_in_progress_is_conflict() {
        let error: AppError = SyncError::SweepInProgress.into();
        assert_eq!(error.status_code(), StatusCode::CONFLICT);
        assert_eq!(error.error_code(), "sweep_in_progress");
    }

    #[test]
    fn test_validation_message_lists_issues() {
        let error = AppError::Validation(vec![
            ValidationIssue {
                field: "sync.groups".into(),
                message: "at least one group must be specified".into(),
            },
            ValidationIssue {
                field: "server.port".into(),
                message: "port must be between 1 and 65535".into(),
            },
        ]);
        let message = error.to_string();
        assert!(message.contains("2 problem(s)"));
        assert!(message.contains("  - sync.groups: at least one group must be specified"));
    }
}
