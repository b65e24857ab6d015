//! Google Workspace directory adapter.
//!
//! Reads groups and members through the Admin SDK Directory API and
//! maintains the enrollment group. Authenticates as a service account
//! with domain-wide delegation, impersonating a super administrator.

pub mod auth;
pub mod client;
pub mod directory;
pub mod error;
pub mod models;

pub use auth::{ServiceAccountKey, WorkspaceAuth, WorkspaceCredentials};
pub use client::WorkspaceClient;
pub use directory::{WorkspaceDirectory, WorkspaceSettings};
pub use error::{WorkspaceError, WorkspaceResult};
