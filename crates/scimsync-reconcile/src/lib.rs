//! Directory reconciliation core.
//!
//! Keeps downstream (SCIM) group membership aligned with an upstream
//! directory and mirrors downstream passkey enrollment back into a
//! distinguished upstream group.
//!
//! The crate is transport-free: both directories are reached through the
//! [`UpstreamDirectory`] and [`DownstreamDirectory`] traits, which adapter
//! crates implement and callers inject into a [`RunCoordinator`].
//!
//! One sweep processes configured groups sequentially:
//!
//! 1. read the upstream group and its members,
//! 2. [`Reconciler::reconcile`] provisions users and patches the downstream group,
//! 3. [`EnrollmentSynchronizer::sync_members`] updates the enrollment group.

pub mod coordinator;
pub mod directory;
pub mod engine;
pub mod enrollment;
pub mod error;
pub mod naming;
pub mod report;
pub mod retry;
pub mod stats;
pub mod types;

#[cfg(feature = "test-support")]
pub mod testing;

pub use coordinator::{RunCoordinator, SyncOptions};
pub use directory::{DownstreamDirectory, UpstreamDirectory};
pub use engine::{ReconcileOutcome, Reconciler};
pub use enrollment::{EnrollmentGroup, EnrollmentSynchronizer};
pub use error::{DirectoryError, DirectoryResult, SyncError, SyncResult};
pub use report::{GroupError, RunReport};
pub use retry::RetryPolicy;
pub use stats::RunStats;
pub use types::{
    DownstreamGroup, DownstreamUser, MemberKind, MemberStatus, NewDownstreamUser, UpstreamGroup,
    UpstreamMember,
};
