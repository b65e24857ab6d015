//! In-memory directories for tests.
//!
//! Both fakes record every call so tests can assert on exactly which
//! mutations reached an adapter.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::directory::{DownstreamDirectory, UpstreamDirectory};
use crate::error::{DirectoryError, DirectoryResult};
use crate::types::{
    DownstreamGroup, DownstreamUser, MemberKind, MemberStatus, NewDownstreamUser, UpstreamGroup,
    UpstreamMember,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Upstream ────────────────────────────────────────────────────────────

/// A call made against [`FakeUpstream`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamCall {
    GetGroup(String),
    GetGroupMembers(String),
    EnsureGroup(String),
    AddMember { group: String, member: String },
    RemoveMember { group: String, member: String },
}

impl UpstreamCall {
    /// Whether this call can change upstream state.
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::EnsureGroup(_) | Self::AddMember { .. } | Self::RemoveMember { .. }
        )
    }
}

#[derive(Debug, Default)]
struct UpstreamState {
    groups: BTreeMap<String, (UpstreamGroup, Vec<UpstreamMember>)>,
    failing_groups: HashSet<String>,
    failing_member_updates: HashSet<String>,
    calls: Vec<UpstreamCall>,
}

/// In-memory upstream directory.
#[derive(Debug, Default)]
pub struct FakeUpstream {
    state: Mutex<UpstreamState>,
}

impl FakeUpstream {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a group with its members.
    pub fn put_group(&self, address: &str, display_name: &str, members: Vec<UpstreamMember>) {
        let group = UpstreamGroup {
            address: address.to_string(),
            display_name: display_name.to_string(),
            description: String::new(),
        };
        lock(&self.state)
            .groups
            .insert(address.to_string(), (group, members));
    }

    /// Replace a group's members.
    pub fn set_members(&self, address: &str, members: Vec<UpstreamMember>) {
        if let Some((_, existing)) = lock(&self.state).groups.get_mut(address) {
            *existing = members;
        }
    }

    /// Make reads of this group fail with a transport error.
    pub fn fail_group(&self, address: &str) {
        lock(&self.state).failing_groups.insert(address.to_string());
    }

    /// Make add/remove of this member fail.
    pub fn fail_member_updates(&self, member: &str) {
        lock(&self.state)
            .failing_member_updates
            .insert(member.to_string());
    }

    /// Addresses currently in a group, if the group exists.
    #[must_use]
    pub fn member_addresses(&self, address: &str) -> Option<BTreeSet<String>> {
        lock(&self.state)
            .groups
            .get(address)
            .map(|(_, members)| members.iter().map(|m| m.address.clone()).collect())
    }

    /// Whether the group exists.
    #[must_use]
    pub fn has_group(&self, address: &str) -> bool {
        lock(&self.state).groups.contains_key(address)
    }

    /// All calls so far.
    #[must_use]
    pub fn calls(&self) -> Vec<UpstreamCall> {
        lock(&self.state).calls.clone()
    }

    /// Calls that could have changed state.
    #[must_use]
    pub fn mutations(&self) -> Vec<UpstreamCall> {
        self.calls().into_iter().filter(UpstreamCall::is_mutation).collect()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        lock(&self.state).calls.clear();
    }

    fn check_readable(state: &UpstreamState, address: &str) -> DirectoryResult<()> {
        if state.failing_groups.contains(address) {
            return Err(DirectoryError::transport(format!("connection reset reading {address}")));
        }
        if !state.groups.contains_key(address) {
            return Err(DirectoryError::not_found("group", address));
        }
        Ok(())
    }
}

#[async_trait]
impl UpstreamDirectory for FakeUpstream {
    async fn get_group(&self, address: &str) -> DirectoryResult<UpstreamGroup> {
        let mut state = lock(&self.state);
        state.calls.push(UpstreamCall::GetGroup(address.to_string()));
        Self::check_readable(&state, address)?;
        Ok(state.groups[address].0.clone())
    }

    async fn get_group_members(&self, address: &str) -> DirectoryResult<Vec<UpstreamMember>> {
        let mut state = lock(&self.state);
        state.calls.push(UpstreamCall::GetGroupMembers(address.to_string()));
        Self::check_readable(&state, address)?;
        Ok(state.groups[address].1.clone())
    }

    async fn ensure_group(
        &self,
        address: &str,
        display_name: &str,
        description: &str,
    ) -> DirectoryResult<UpstreamGroup> {
        let mut state = lock(&self.state);
        state.calls.push(UpstreamCall::EnsureGroup(address.to_string()));
        if state.failing_groups.contains(address) {
            return Err(DirectoryError::transport(format!("connection reset creating {address}")));
        }
        let entry = state.groups.entry(address.to_string()).or_insert_with(|| {
            let group = UpstreamGroup {
                address: address.to_string(),
                display_name: display_name.to_string(),
                description: description.to_string(),
            };
            (group, Vec::new())
        });
        Ok(entry.0.clone())
    }

    async fn add_member(&self, group_address: &str, member_address: &str) -> DirectoryResult<()> {
        let mut state = lock(&self.state);
        state.calls.push(UpstreamCall::AddMember {
            group: group_address.to_string(),
            member: member_address.to_string(),
        });
        if state.failing_member_updates.contains(member_address) {
            return Err(DirectoryError::Api {
                status: 400,
                detail: format!("cannot add {member_address}"),
            });
        }
        let Some((_, members)) = state.groups.get_mut(group_address) else {
            return Err(DirectoryError::not_found("group", group_address));
        };
        if !members.iter().any(|m| m.address.eq_ignore_ascii_case(member_address)) {
            members.push(UpstreamMember::new(
                member_address,
                MemberKind::Person,
                MemberStatus::Active,
            ));
        }
        Ok(())
    }

    async fn remove_member(&self, group_address: &str, member_address: &str) -> DirectoryResult<()> {
        let mut state = lock(&self.state);
        state.calls.push(UpstreamCall::RemoveMember {
            group: group_address.to_string(),
            member: member_address.to_string(),
        });
        if state.failing_member_updates.contains(member_address) {
            return Err(DirectoryError::Api {
                status: 400,
                detail: format!("cannot remove {member_address}"),
            });
        }
        if let Some((_, members)) = state.groups.get_mut(group_address) {
            members.retain(|m| !m.address.eq_ignore_ascii_case(member_address));
        }
        Ok(())
    }
}

// ── Downstream ──────────────────────────────────────────────────────────

/// A call made against [`FakeDownstream`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownstreamCall {
    FindGroup(String),
    CreateGroup(String),
    FindUser(String),
    CreateUser(String),
    GetGroupMembers(String),
    PatchGroupMembers {
        group_id: String,
        to_add: Vec<String>,
        to_remove: Vec<String>,
    },
    IsEnrolled(String),
}

impl DownstreamCall {
    /// Whether this call can change downstream state.
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::CreateGroup(_) | Self::CreateUser(_) | Self::PatchGroupMembers { .. }
        )
    }
}

#[derive(Debug, Default)]
struct DownstreamState {
    next_id: u32,
    /// Keyed by user name (the upstream address).
    users: BTreeMap<String, DownstreamUser>,
    /// Keyed by group id.
    groups: BTreeMap<String, (String, BTreeSet<String>)>,
    passkeys: HashMap<String, bool>,
    failing_users: HashSet<String>,
    failing_enrollment: HashSet<String>,
    conflict_on_create: bool,
    fail_patch: bool,
    calls: Vec<DownstreamCall>,
}

impl DownstreamState {
    fn allocate(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn insert_user(&mut self, address: &str, display_name: &str) -> DownstreamUser {
        let user = DownstreamUser {
            id: self.allocate("user"),
            external_id: Some(address.to_string()),
            user_name: address.to_string(),
            display_name: Some(display_name.to_string()),
            work_email: Some(address.to_string()),
            active: true,
            enrolled: false,
        };
        self.users.insert(address.to_string(), user.clone());
        user
    }
}

/// In-memory downstream directory.
#[derive(Debug, Default)]
pub struct FakeDownstream {
    state: Mutex<DownstreamState>,
}

impl FakeDownstream {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an active user and return its id.
    pub fn put_user(&self, address: &str) -> String {
        lock(&self.state)
            .insert_user(address, &crate::naming::display_name_from_address(address))
            .id
    }

    /// Seed a group with the given member ids and return its id.
    pub fn put_group(&self, display_name: &str, member_ids: &[String]) -> String {
        let mut state = lock(&self.state);
        let id = state.allocate("group");
        state.groups.insert(
            id.clone(),
            (display_name.to_string(), member_ids.iter().cloned().collect()),
        );
        id
    }

    /// Set whether a user holds an active passkey.
    pub fn set_passkey(&self, address: &str, active: bool) {
        lock(&self.state).passkeys.insert(address.to_string(), active);
    }

    /// Set a user's active flag.
    pub fn set_active(&self, address: &str, active: bool) {
        if let Some(user) = lock(&self.state).users.get_mut(address) {
            user.active = active;
        }
    }

    /// Make user search/create for this address fail.
    pub fn fail_user(&self, address: &str) {
        lock(&self.state).failing_users.insert(address.to_string());
    }

    /// Make enrollment lookups for this address fail.
    pub fn fail_enrollment_lookup(&self, address: &str) {
        lock(&self.state)
            .failing_enrollment
            .insert(address.to_string());
    }

    /// Make every create report a conflict after storing the resource, as
    /// when a concurrent writer won the race.
    pub fn conflict_on_create(&self) {
        lock(&self.state).conflict_on_create = true;
    }

    /// Make membership patches fail.
    pub fn fail_patch(&self) {
        lock(&self.state).fail_patch = true;
    }

    /// Id of the user with this user name.
    #[must_use]
    pub fn user_id(&self, address: &str) -> Option<String> {
        lock(&self.state).users.get(address).map(|u| u.id.clone())
    }

    /// Stored user by user name.
    #[must_use]
    pub fn user(&self, address: &str) -> Option<DownstreamUser> {
        lock(&self.state).users.get(address).cloned()
    }

    /// Number of stored users.
    #[must_use]
    pub fn user_count(&self) -> usize {
        lock(&self.state).users.len()
    }

    /// Member ids of the group with this display name.
    #[must_use]
    pub fn members_of(&self, display_name: &str) -> Option<BTreeSet<String>> {
        lock(&self.state)
            .groups
            .values()
            .find(|(name, _)| name == display_name)
            .map(|(_, members)| members.clone())
    }

    /// Number of stored groups.
    #[must_use]
    pub fn group_count(&self) -> usize {
        lock(&self.state).groups.len()
    }

    /// All calls so far.
    #[must_use]
    pub fn calls(&self) -> Vec<DownstreamCall> {
        lock(&self.state).calls.clone()
    }

    /// Calls that could have changed state.
    #[must_use]
    pub fn mutations(&self) -> Vec<DownstreamCall> {
        self.calls()
            .into_iter()
            .filter(DownstreamCall::is_mutation)
            .collect()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        lock(&self.state).calls.clear();
    }
}

#[async_trait]
impl DownstreamDirectory for FakeDownstream {
    async fn find_group_by_display_name(
        &self,
        display_name: &str,
    ) -> DirectoryResult<Option<DownstreamGroup>> {
        let mut state = lock(&self.state);
        state.calls.push(DownstreamCall::FindGroup(display_name.to_string()));
        Ok(state
            .groups
            .iter()
            .find(|(_, (name, _))| name == display_name)
            .map(|(id, (name, _))| DownstreamGroup {
                id: id.clone(),
                display_name: name.clone(),
            }))
    }

    async fn create_group(&self, display_name: &str) -> DirectoryResult<DownstreamGroup> {
        let mut state = lock(&self.state);
        state.calls.push(DownstreamCall::CreateGroup(display_name.to_string()));
        let id = state.allocate("group");
        state
            .groups
            .insert(id.clone(), (display_name.to_string(), BTreeSet::new()));
        if state.conflict_on_create {
            return Err(DirectoryError::Conflict(format!("group {display_name} exists")));
        }
        Ok(DownstreamGroup {
            id,
            display_name: display_name.to_string(),
        })
    }

    async fn find_user_by_address(&self, address: &str) -> DirectoryResult<Option<DownstreamUser>> {
        let mut state = lock(&self.state);
        state.calls.push(DownstreamCall::FindUser(address.to_string()));
        if state.failing_users.contains(address) {
            return Err(DirectoryError::Api {
                status: 400,
                detail: format!("invalid filter for {address}"),
            });
        }
        Ok(state.users.get(address).cloned())
    }

    async fn create_user(&self, user: &NewDownstreamUser) -> DirectoryResult<DownstreamUser> {
        let mut state = lock(&self.state);
        state.calls.push(DownstreamCall::CreateUser(user.address.clone()));
        let created = state.insert_user(&user.address, &user.display_name);
        if state.conflict_on_create {
            return Err(DirectoryError::Conflict(format!("user {} exists", user.address)));
        }
        Ok(created)
    }

    async fn get_group_members(&self, group_id: &str) -> DirectoryResult<Vec<String>> {
        let mut state = lock(&self.state);
        state
            .calls
            .push(DownstreamCall::GetGroupMembers(group_id.to_string()));
        state
            .groups
            .get(group_id)
            .map(|(_, members)| members.iter().cloned().collect())
            .ok_or_else(|| DirectoryError::not_found("group", group_id))
    }

    async fn patch_group_members(
        &self,
        group_id: &str,
        to_add: &[String],
        to_remove: &[String],
    ) -> DirectoryResult<()> {
        let mut state = lock(&self.state);
        state.calls.push(DownstreamCall::PatchGroupMembers {
            group_id: group_id.to_string(),
            to_add: to_add.to_vec(),
            to_remove: to_remove.to_vec(),
        });
        if state.fail_patch {
            return Err(DirectoryError::Api {
                status: 500,
                detail: "patch failed".to_string(),
            });
        }
        let Some((_, members)) = state.groups.get_mut(group_id) else {
            return Err(DirectoryError::not_found("group", group_id));
        };
        for id in to_remove {
            members.remove(id);
        }
        members.extend(to_add.iter().cloned());
        Ok(())
    }

    async fn is_enrolled(&self, address: &str) -> DirectoryResult<bool> {
        let mut state = lock(&self.state);
        state.calls.push(DownstreamCall::IsEnrolled(address.to_string()));
        if state.failing_enrollment.contains(address) {
            return Err(DirectoryError::Api {
                status: 400,
                detail: "lookup failed".to_string(),
            });
        }
        let Some(user) = state.users.get(address) else {
            return Ok(false);
        };
        Ok(user.active && state.passkeys.get(address).copied().unwrap_or(false))
    }
}
