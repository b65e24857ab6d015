//! `ScimDirectory` as a `DownstreamDirectory`: enrollment checks, conflict
//! mapping and membership reads.

mod helpers;

use helpers::mock_downstream::{native_user, scim_user, MockDownstream};
use serde_json::json;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, ResponseTemplate};

use scimsync_reconcile::{DirectoryError, DownstreamDirectory, NewDownstreamUser};

#[tokio::test]
async fn test_is_enrolled_false_without_scim_user() {
    let mock = MockDownstream::start().await;
    mock.mock_user_search("ghost@co", vec![]).await;

    let enrolled = mock.directory().is_enrolled("ghost@co").await.unwrap();

    assert!(!enrolled);
}

#[tokio::test]
async fn test_is_enrolled_false_for_inactive_user() {
    let mock = MockDownstream::start().await;
    mock.mock_user_search("gone@co", vec![scim_user("u-1", "gone@co", false)])
        .await;
    // Passkey state must not be consulted for inactive users.
    Mock::given(method("GET"))
        .and(path("/v2/users"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock.server)
        .await;

    assert!(!mock.directory().is_enrolled("gone@co").await.unwrap());
}

#[tokio::test]
async fn test_is_enrolled_uses_native_passkey_state() {
    let mock = MockDownstream::start().await;
    mock.mock_user_search("alice@co", vec![scim_user("u-1", "alice@co", true)])
        .await;
    mock.mock_user_search("bob@co", vec![scim_user("u-2", "bob@co", true)])
        .await;
    mock.mock_native_users(vec![
        native_user("Alice@Co", true),
        native_user("bob@co", false),
    ])
    .await;

    let directory = mock.directory();
    assert!(directory.is_enrolled("alice@co").await.unwrap());
    assert!(!directory.is_enrolled("bob@co").await.unwrap());
}

#[tokio::test]
async fn test_is_enrolled_false_when_native_user_missing() {
    let mock = MockDownstream::start().await;
    mock.mock_user_search("carol@co", vec![scim_user("u-3", "carol@co", true)])
        .await;
    mock.mock_native_users(vec![native_user("someone@co", true)])
        .await;

    assert!(!mock.directory().is_enrolled("carol@co").await.unwrap());
}

#[tokio::test]
async fn test_is_enrolled_falls_back_to_active_when_native_fails() {
    let mock = MockDownstream::start().await;
    mock.mock_user_search("alice@co", vec![scim_user("u-1", "alice@co", true)])
        .await;
    mock.mock_native_failure(500).await;

    let enrolled = mock.directory().is_enrolled("alice@co").await.unwrap();

    assert!(enrolled);
}

#[tokio::test]
async fn test_is_enrolled_propagates_scim_failure() {
    let mock = MockDownstream::start().await;
    Mock::given(method("GET"))
        .and(path("/scim/v2/Users"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&mock.server)
        .await;

    let error = mock.directory().is_enrolled("alice@co").await.unwrap_err();

    assert!(error.is_transient());
}

#[tokio::test]
async fn test_native_lookup_follows_page_tokens() {
    let mock = MockDownstream::start().await;
    mock.mock_user_search("late@co", vec![scim_user("u-9", "late@co", true)])
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/users"))
        .and(query_param_is_missing("page_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": [native_user("early@co", false)],
            "next_page_token": "p2"
        })))
        .expect(1)
        .mount(&mock.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/users"))
        .and(query_param("page_token", "p2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": [native_user("late@co", true)]
        })))
        .expect(1)
        .mount(&mock.server)
        .await;

    assert!(mock.directory().is_enrolled("late@co").await.unwrap());
}

#[tokio::test]
async fn test_native_lookup_stops_at_page_limit() {
    let mock = MockDownstream::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": [native_user("other@co", true)],
            "next_page_token": "again"
        })))
        .expect(20)
        .mount(&mock.server)
        .await;

    let found = mock.native_client().find_user("nobody@co").await.unwrap();

    assert!(found.is_none());
}

#[tokio::test]
async fn test_create_user_conflict_maps_to_directory_conflict() {
    let mock = MockDownstream::start().await;
    Mock::given(method("POST"))
        .and(path("/scim/v2/Users"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "detail": "userName must be unique"
        })))
        .mount(&mock.server)
        .await;

    let user = NewDownstreamUser {
        external_id: "alice@co".to_string(),
        address: "alice@co".to_string(),
        display_name: "Alice".to_string(),
    };
    let error = mock.directory().create_user(&user).await.unwrap_err();

    assert!(error.is_conflict());
    assert!(!error.is_transient());
}

#[tokio::test]
async fn test_create_user_maps_resource() {
    let mock = MockDownstream::start().await;
    Mock::given(method("POST"))
        .and(path("/scim/v2/Users"))
        .respond_with(ResponseTemplate::new(201).set_body_json(scim_user("u-5", "dave@co", true)))
        .mount(&mock.server)
        .await;

    let user = NewDownstreamUser {
        external_id: "dave@co".to_string(),
        address: "dave@co".to_string(),
        display_name: "Dave".to_string(),
    };
    let created = mock.directory().create_user(&user).await.unwrap();

    assert_eq!(created.id, "u-5");
    assert_eq!(created.user_name, "dave@co");
    assert!(!created.enrolled);
}

#[tokio::test]
async fn test_get_group_members_returns_ids() {
    let mock = MockDownstream::start().await;
    Mock::given(method("GET"))
        .and(path("/scim/v2/Groups/g-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "g-1",
            "displayName": "GoogleSCIM_Engineering",
            "members": [{ "value": "u-1" }, { "value": "u-2" }]
        })))
        .mount(&mock.server)
        .await;

    let members = mock.directory().get_group_members("g-1").await.unwrap();

    assert_eq!(members, vec!["u-1".to_string(), "u-2".to_string()]);
}

#[tokio::test]
async fn test_missing_group_maps_to_not_found() {
    let mock = MockDownstream::start().await;
    Mock::given(method("GET"))
        .and(path("/scim/v2/Groups/g-404"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock.server)
        .await;

    let error = mock.directory().get_group_members("g-404").await.unwrap_err();

    assert!(error.is_not_found());
    assert!(matches!(error, DirectoryError::NotFound { .. }));
}
