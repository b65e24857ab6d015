//! Shared fixtures for reconciliation tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use scimsync_reconcile::testing::{FakeDownstream, FakeUpstream};
use scimsync_reconcile::{
    EnrollmentGroup, MemberKind, MemberStatus, Reconciler, RetryPolicy, RunCoordinator,
    SyncOptions, UpstreamMember,
};

pub const PREFIX: &str = "GoogleSCIM_";
pub const ENROLLED: &str = "byid-enrolled@co";

pub fn person(address: &str) -> UpstreamMember {
    UpstreamMember::new(address, MemberKind::Person, MemberStatus::Active)
}

pub fn suspended(address: &str) -> UpstreamMember {
    UpstreamMember::new(address, MemberKind::Person, MemberStatus::Suspended)
}

pub fn nested_group(address: &str) -> UpstreamMember {
    UpstreamMember::new(address, MemberKind::Group, MemberStatus::Active)
}

pub fn no_retry() -> RetryPolicy {
    RetryPolicy::new(2, Duration::ZERO)
}

pub fn reconciler(downstream: &Arc<FakeDownstream>, test_mode: bool) -> Reconciler {
    Reconciler::new(downstream.clone(), no_retry(), PREFIX, test_mode)
}

pub fn options(test_mode: bool) -> SyncOptions {
    SyncOptions {
        group_prefix: PREFIX.to_string(),
        test_mode,
        retry: no_retry(),
        enrollment_group: EnrollmentGroup {
            address: ENROLLED.to_string(),
            display_name: "BYID Enrolled".to_string(),
            description: "Enrolled users".to_string(),
        },
        prune_enrollment_group: true,
    }
}

pub struct Fixture {
    pub upstream: Arc<FakeUpstream>,
    pub downstream: Arc<FakeDownstream>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            upstream: Arc::new(FakeUpstream::new()),
            downstream: Arc::new(FakeDownstream::new()),
        }
    }

    pub fn coordinator(&self, test_mode: bool) -> RunCoordinator {
        RunCoordinator::new(
            self.upstream.clone(),
            self.downstream.clone(),
            options(test_mode),
        )
    }
}

pub fn groups(addresses: &[&str]) -> Vec<String> {
    addresses.iter().map(|a| (*a).to_string()).collect()
}
