//! Reconciliation engine behaviour against in-memory directories.

mod helpers;

use std::collections::BTreeSet;
use std::sync::Arc;

use helpers::{nested_group, person, reconciler, suspended, PREFIX};
use scimsync_reconcile::engine::{TEST_GROUP_ID, TEST_USER_ID_PREFIX};
use scimsync_reconcile::testing::{DownstreamCall, FakeDownstream};
use scimsync_reconcile::{SyncError, UpstreamGroup};

fn eng() -> UpstreamGroup {
    UpstreamGroup {
        address: "eng@co".to_string(),
        display_name: "Engineering".to_string(),
        description: "All engineers".to_string(),
    }
}

#[tokio::test]
async fn test_new_group_and_user_are_created_and_suspended_excluded() {
    let downstream = Arc::new(FakeDownstream::new());
    let engine = reconciler(&downstream, false);

    let outcome = engine
        .reconcile(&eng(), &[person("alice@co"), suspended("bob@co")])
        .await;

    assert!(outcome.completed);
    assert!(outcome.errors.is_empty());
    assert_eq!(outcome.stats.groups_processed, 1);
    assert_eq!(outcome.stats.groups_created, 1);
    assert_eq!(outcome.stats.users_created, 1);
    assert_eq!(outcome.stats.memberships_added, 1);
    assert_eq!(outcome.stats.memberships_removed, 0);

    let alice = downstream.user("alice@co").expect("alice provisioned");
    assert_eq!(alice.external_id.as_deref(), Some("alice@co"));
    assert_eq!(alice.work_email.as_deref(), Some("alice@co"));
    assert_eq!(alice.display_name.as_deref(), Some("Alice"));
    assert!(downstream.user("bob@co").is_none());
    assert!(!downstream
        .calls()
        .contains(&DownstreamCall::FindUser("bob@co".to_string())));

    let members = downstream.members_of("GoogleSCIM_Engineering").unwrap();
    assert_eq!(members, BTreeSet::from([alice.id]));
}

#[tokio::test]
async fn test_diff_produces_single_patch_with_add_and_remove() {
    let downstream = Arc::new(FakeDownstream::new());
    let alice = downstream.put_user("alice@co");
    let bob = downstream.put_user("bob@co");
    let carol = downstream.put_user("carol@co");
    let group_id = downstream.put_group("GoogleSCIM_Engineering", &[alice.clone(), carol.clone()]);
    let engine = reconciler(&downstream, false);

    let outcome = engine
        .reconcile(&eng(), &[person("alice@co"), person("bob@co")])
        .await;

    assert!(outcome.completed);
    assert_eq!(outcome.to_add, vec![bob.clone()]);
    assert_eq!(outcome.to_remove, vec![carol.clone()]);
    assert_eq!(outcome.stats.groups_created, 0);
    assert_eq!(outcome.stats.users_created, 0);
    assert_eq!(outcome.stats.memberships_added, 1);
    assert_eq!(outcome.stats.memberships_removed, 1);

    let patches: Vec<_> = downstream
        .calls()
        .into_iter()
        .filter(|c| matches!(c, DownstreamCall::PatchGroupMembers { .. }))
        .collect();
    assert_eq!(
        patches,
        vec![DownstreamCall::PatchGroupMembers {
            group_id,
            to_add: vec![bob.clone()],
            to_remove: vec![carol],
        }]
    );
    assert_eq!(
        downstream.members_of("GoogleSCIM_Engineering").unwrap(),
        BTreeSet::from([alice, bob])
    );
}

#[tokio::test]
async fn test_second_run_is_a_no_op() {
    let downstream = Arc::new(FakeDownstream::new());
    let engine = reconciler(&downstream, false);
    let members = [person("alice@co"), person("bob@co")];

    engine.reconcile(&eng(), &members).await;
    downstream.clear_calls();
    let outcome = engine.reconcile(&eng(), &members).await;

    assert!(outcome.completed);
    assert!(outcome.to_add.is_empty());
    assert!(outcome.to_remove.is_empty());
    assert!(downstream.mutations().is_empty());
    assert_eq!(outcome.stats.groups_processed, 1);
    assert_eq!(outcome.stats.total_changes(), 0);
}

#[tokio::test]
async fn test_converges_regardless_of_existing_membership() {
    let downstream = Arc::new(FakeDownstream::new());
    let stale: Vec<String> = ["x@co", "y@co", "z@co"]
        .iter()
        .map(|a| downstream.put_user(a))
        .collect();
    downstream.put_group("GoogleSCIM_Engineering", &stale);
    let engine = reconciler(&downstream, false);

    let outcome = engine
        .reconcile(&eng(), &[person("alice@co"), person("y@co")])
        .await;

    assert!(outcome.completed);
    let expected = BTreeSet::from([
        downstream.user_id("alice@co").unwrap(),
        downstream.user_id("y@co").unwrap(),
    ]);
    assert_eq!(downstream.members_of("GoogleSCIM_Engineering").unwrap(), expected);
    assert_eq!(outcome.stats.memberships_removed, 2);
}

#[tokio::test]
async fn test_non_person_and_inactive_members_never_desired() {
    let downstream = Arc::new(FakeDownstream::new());
    // Even a pre-existing downstream user is removed once suspended upstream.
    let bob = downstream.put_user("bob@co");
    downstream.put_group("GoogleSCIM_Engineering", &[bob.clone()]);
    let engine = reconciler(&downstream, false);

    let outcome = engine
        .reconcile(
            &eng(),
            &[person("alice@co"), suspended("bob@co"), nested_group("team@co")],
        )
        .await;

    assert_eq!(outcome.to_remove, vec![bob]);
    assert!(downstream.user("team@co").is_none());
    assert_eq!(downstream.members_of("GoogleSCIM_Engineering").unwrap().len(), 1);
}

#[tokio::test]
async fn test_user_failure_excludes_user_but_group_completes() {
    let downstream = Arc::new(FakeDownstream::new());
    downstream.fail_user("broken@co");
    let engine = reconciler(&downstream, false);

    let outcome = engine
        .reconcile(&eng(), &[person("alice@co"), person("broken@co")])
        .await;

    assert!(outcome.completed);
    assert_eq!(outcome.stats.groups_processed, 1);
    assert_eq!(outcome.stats.memberships_added, 1);
    assert_eq!(outcome.errors.len(), 1);
    assert!(matches!(
        &outcome.errors[0],
        SyncError::User { address, .. } if address == "broken@co"
    ));
}

#[tokio::test]
async fn test_patch_failure_aborts_group() {
    let downstream = Arc::new(FakeDownstream::new());
    downstream.fail_patch();
    let engine = reconciler(&downstream, false);

    let outcome = engine.reconcile(&eng(), &[person("alice@co")]).await;

    assert!(!outcome.completed);
    assert_eq!(outcome.stats.groups_processed, 0);
    assert_eq!(outcome.stats.memberships_added, 0);
    // Creation already happened and is still counted.
    assert_eq!(outcome.stats.users_created, 1);
    assert!(matches!(outcome.errors.last(), Some(SyncError::Patch { .. })));
}

#[tokio::test]
async fn test_create_conflict_falls_back_to_existing_resource() {
    let downstream = Arc::new(FakeDownstream::new());
    downstream.conflict_on_create();
    let engine = reconciler(&downstream, false);

    let outcome = engine.reconcile(&eng(), &[person("alice@co")]).await;

    assert!(outcome.completed, "errors: {:?}", outcome.errors);
    assert!(outcome.errors.is_empty());
    assert_eq!(outcome.stats.groups_created, 0);
    assert_eq!(outcome.stats.users_created, 0);
    assert_eq!(outcome.stats.memberships_added, 1);
    assert_eq!(downstream.group_count(), 1);
}

#[tokio::test]
async fn test_test_mode_reads_but_never_mutates() {
    let downstream = Arc::new(FakeDownstream::new());
    let engine = reconciler(&downstream, true);

    let outcome = engine
        .reconcile(&eng(), &[person("alice@co"), person("bob@co")])
        .await;

    assert!(outcome.completed);
    assert!(outcome.errors.is_empty());
    assert_eq!(outcome.stats.groups_processed, 1);
    assert_eq!(outcome.stats.total_changes(), 0);
    assert_eq!(outcome.group_id.as_deref(), Some(TEST_GROUP_ID));
    assert!(outcome
        .to_add
        .iter()
        .all(|id| id.starts_with(TEST_USER_ID_PREFIX)));
    assert_eq!(outcome.to_add.len(), 2);

    assert!(downstream.mutations().is_empty());
    let calls = downstream.calls();
    assert!(calls.contains(&DownstreamCall::FindGroup("GoogleSCIM_Engineering".into())));
    assert!(calls.contains(&DownstreamCall::FindUser("alice@co".into())));
    assert_eq!(downstream.group_count(), 0);
    assert_eq!(downstream.user_count(), 0);
}

#[tokio::test]
async fn test_test_mode_reports_diff_for_existing_group() {
    let downstream = Arc::new(FakeDownstream::new());
    let carol = downstream.put_user("carol@co");
    downstream.put_group("GoogleSCIM_Engineering", &[carol.clone()]);
    let engine = reconciler(&downstream, true);

    let outcome = engine.reconcile(&eng(), &[person("carol@co")]).await;
    assert!(outcome.to_add.is_empty() && outcome.to_remove.is_empty());

    let outcome = engine.reconcile(&eng(), &[]).await;
    assert_eq!(outcome.to_remove, vec![carol]);
    assert_eq!(outcome.stats.memberships_removed, 0);
    assert!(downstream.mutations().is_empty());
}

#[tokio::test]
async fn test_prefix_applied_and_blank_name_uses_address() {
    let downstream = Arc::new(FakeDownstream::new());
    let engine = reconciler(&downstream, false);
    let unnamed = UpstreamGroup {
        address: "ops@co".to_string(),
        display_name: "  ".to_string(),
        description: String::new(),
    };

    assert_eq!(engine.downstream_group_name(&eng()), format!("{PREFIX}Engineering"));
    engine.reconcile(&unnamed, &[]).await;
    assert!(downstream.members_of("GoogleSCIM_ops@co").is_some());
}
