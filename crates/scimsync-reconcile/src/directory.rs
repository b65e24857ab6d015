//! Capabilities the core consumes from the two directories.
//!
//! Adapters map "not found" on reads to `Ok(None)` (downstream) or
//! [`DirectoryError::NotFound`](crate::DirectoryError::NotFound)
//! (upstream), and are expected to bound every HTTP call with a timeout.

use async_trait::async_trait;

use crate::error::DirectoryResult;
use crate::types::{DownstreamGroup, DownstreamUser, NewDownstreamUser, UpstreamGroup, UpstreamMember};

/// The authoritative directory (groups of people).
#[async_trait]
pub trait UpstreamDirectory: Send + Sync {
    /// Read a group by address.
    async fn get_group(&self, address: &str) -> DirectoryResult<UpstreamGroup>;

    /// List the current members of a group.
    async fn get_group_members(&self, address: &str) -> DirectoryResult<Vec<UpstreamMember>>;

    /// Return the group, creating it when absent.
    async fn ensure_group(
        &self,
        address: &str,
        display_name: &str,
        description: &str,
    ) -> DirectoryResult<UpstreamGroup>;

    /// Add a member. Succeeds if the address is already a member.
    async fn add_member(&self, group_address: &str, member_address: &str) -> DirectoryResult<()>;

    /// Remove a member. Succeeds if the address is not a member.
    async fn remove_member(&self, group_address: &str, member_address: &str)
        -> DirectoryResult<()>;
}

/// The provisioned identity-assurance directory.
#[async_trait]
pub trait DownstreamDirectory: Send + Sync {
    /// Find a group by exact display name.
    async fn find_group_by_display_name(
        &self,
        display_name: &str,
    ) -> DirectoryResult<Option<DownstreamGroup>>;

    /// Create a group. A conflicting create returns the existing group.
    async fn create_group(&self, display_name: &str) -> DirectoryResult<DownstreamGroup>;

    /// Find a user whose username is the given address.
    async fn find_user_by_address(&self, address: &str) -> DirectoryResult<Option<DownstreamUser>>;

    /// Create a user. A conflicting create returns the existing user.
    async fn create_user(&self, user: &NewDownstreamUser) -> DirectoryResult<DownstreamUser>;

    /// Identifiers of the users currently in a group.
    async fn get_group_members(&self, group_id: &str) -> DirectoryResult<Vec<String>>;

    /// Apply removals then additions to a group's membership in one call.
    async fn patch_group_members(
        &self,
        group_id: &str,
        to_add: &[String],
        to_remove: &[String],
    ) -> DirectoryResult<()>;

    /// Whether the user is active and holds an active passkey.
    async fn is_enrolled(&self, address: &str) -> DirectoryResult<bool>;
}
