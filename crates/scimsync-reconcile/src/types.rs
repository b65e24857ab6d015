//! Directory entities as seen by the reconciliation core.

use serde::{Deserialize, Serialize};

/// Kind of an upstream group member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberKind {
    Person,
    Group,
    Other,
}

/// Account status of an upstream group member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberStatus {
    Active,
    Suspended,
    Other,
}

/// A group in the upstream directory, addressed by its email-like key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamGroup {
    pub address: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
}

/// One member of an upstream group. Recomputed every sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamMember {
    pub address: String,
    pub kind: MemberKind,
    pub status: MemberStatus,
}

impl UpstreamMember {
    /// Create a new member.
    #[must_use]
    pub fn new(address: impl Into<String>, kind: MemberKind, status: MemberStatus) -> Self {
        Self {
            address: address.into(),
            kind,
            status,
        }
    }

    /// Active person, the only shape that is provisioned downstream or
    /// considered for enrollment tracking.
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        self.kind == MemberKind::Person && self.status == MemberStatus::Active
    }
}

/// A user record held by the downstream directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownstreamUser {
    /// Identifier assigned by the downstream system.
    pub id: String,
    /// Correlation key, set to the upstream address on creation.
    pub external_id: Option<String>,
    pub user_name: String,
    pub display_name: Option<String>,
    pub work_email: Option<String>,
    pub active: bool,
    /// Enrollment hint carried on the user record itself, when the
    /// downstream payload exposes one. The authoritative answer comes
    /// from [`crate::DownstreamDirectory::is_enrolled`].
    pub enrolled: bool,
}

/// Attributes for a user the engine is about to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDownstreamUser {
    pub external_id: String,
    pub address: String,
    pub display_name: String,
}

/// A group held by the downstream directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownstreamGroup {
    pub id: String,
    pub display_name: String,
}
