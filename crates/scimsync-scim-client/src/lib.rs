//! Downstream directory adapter.
//!
//! [`client::ScimClient`] speaks SCIM 2.0 (RFC 7644) to the provisioning
//! endpoint; [`native::NativeClient`] reads passkey status from the vendor's
//! native REST API. [`directory::ScimDirectory`] combines both behind
//! [`scimsync_reconcile::DownstreamDirectory`].

pub mod auth;
pub mod client;
pub mod directory;
pub mod error;
pub mod mapper;
pub mod models;
pub mod native;

pub use directory::{ScimDirectory, ScimSettings};
pub use error::{ScimClientError, ScimClientResult};
