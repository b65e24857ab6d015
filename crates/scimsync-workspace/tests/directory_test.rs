//! Admin SDK groups and members through `WorkspaceDirectory`.

mod helpers;

use helpers::{api_error, group, member, MockWorkspace, API_PREFIX};
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, ResponseTemplate};

use scimsync_reconcile::{DirectoryError, MemberKind, MemberStatus, UpstreamDirectory};
use scimsync_workspace::WorkspaceDirectory;

#[tokio::test]
async fn test_get_group_maps_fields() {
    let mock = MockWorkspace::start().await;
    mock.mock_group("eng@co", "Engineering").await;

    let group = mock.directory().get_group("eng@co").await.unwrap();

    assert_eq!(group.address, "eng@co");
    assert_eq!(group.display_name, "Engineering");
}

#[tokio::test]
async fn test_missing_group_is_not_found() {
    let mock = MockWorkspace::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{API_PREFIX}/groups/ghost@co")))
        .respond_with(ResponseTemplate::new(404).set_body_json(api_error(404, "Resource Not Found: groupKey")))
        .mount(&mock.server)
        .await;

    let error = mock.directory().get_group("ghost@co").await.unwrap_err();

    assert!(error.is_not_found());
    assert!(!error.is_transient());
}

#[tokio::test]
async fn test_members_follow_page_tokens() {
    let mock = MockWorkspace::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{API_PREFIX}/groups/eng@co/members")))
        .and(query_param("maxResults", "200"))
        .and(query_param_is_missing("pageToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "admin#directory#members",
            "members": [
                member("alice@co", "USER", "ACTIVE"),
                member("team@co", "GROUP", "ACTIVE")
            ],
            "nextPageToken": "page-2"
        })))
        .expect(1)
        .mount(&mock.server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{API_PREFIX}/groups/eng@co/members")))
        .and(query_param("pageToken", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "members": [member("bob@co", "USER", "SUSPENDED")]
        })))
        .expect(1)
        .mount(&mock.server)
        .await;

    let members = mock.directory().get_group_members("eng@co").await.unwrap();

    let summary: Vec<(&str, MemberKind, MemberStatus)> = members
        .iter()
        .map(|m| (m.address.as_str(), m.kind, m.status))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("alice@co", MemberKind::Person, MemberStatus::Active),
            ("team@co", MemberKind::Group, MemberStatus::Active),
            ("bob@co", MemberKind::Person, MemberStatus::Suspended),
        ]
    );
}

#[tokio::test]
async fn test_repeating_page_token_stops_at_page_limit() {
    let mock = MockWorkspace::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{API_PREFIX}/groups/eng@co/members")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "members": [member("alice@co", "USER", "ACTIVE")],
            "nextPageToken": "same-again"
        })))
        .expect(3)
        .mount(&mock.server)
        .await;

    let directory = WorkspaceDirectory::new(mock.client().with_max_member_pages(3));
    let err = directory.get_group_members("eng@co").await.unwrap_err();

    assert!(matches!(err, DirectoryError::InvalidResponse(_)));
    assert!(!err.is_transient());
    assert!(err.to_string().contains("eng@co"));
}

#[tokio::test]
async fn test_members_of_empty_group() {
    let mock = MockWorkspace::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{API_PREFIX}/groups/empty@co/members")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "admin#directory#members"
        })))
        .mount(&mock.server)
        .await;

    assert!(mock.directory().get_group_members("empty@co").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_members_not_found_is_empty() {
    let mock = MockWorkspace::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{API_PREFIX}/groups/gone@co/members")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock.server)
        .await;

    assert!(mock.directory().get_group_members("gone@co").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_add_member_posts_user_member() {
    let mock = MockWorkspace::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{API_PREFIX}/groups/byid-enrolled@co/members")))
        .and(body_json(json!({ "email": "alice@co", "role": "MEMBER", "type": "USER" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(member("alice@co", "USER", "ACTIVE")))
        .expect(1)
        .mount(&mock.server)
        .await;

    mock.directory()
        .add_member("byid-enrolled@co", "alice@co")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_add_existing_member_succeeds() {
    let mock = MockWorkspace::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{API_PREFIX}/groups/byid-enrolled@co/members")))
        .respond_with(ResponseTemplate::new(409).set_body_json(api_error(409, "Member already exists.")))
        .mount(&mock.server)
        .await;

    mock.directory()
        .add_member("byid-enrolled@co", "alice@co")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_remove_member_deletes() {
    let mock = MockWorkspace::start().await;
    Mock::given(method("DELETE"))
        .and(path(format!("{API_PREFIX}/groups/byid-enrolled@co/members/bob@co")))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock.server)
        .await;

    mock.directory()
        .remove_member("byid-enrolled@co", "bob@co")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_remove_absent_member_succeeds() {
    let mock = MockWorkspace::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(404).set_body_json(api_error(404, "Resource Not Found: memberKey")))
        .mount(&mock.server)
        .await;

    mock.directory()
        .remove_member("byid-enrolled@co", "bob@co")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_ensure_group_creates_when_missing() {
    let mock = MockWorkspace::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{API_PREFIX}/groups/byid-enrolled@co")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock.server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{API_PREFIX}/groups")))
        .and(body_json(json!({
            "email": "byid-enrolled@co",
            "name": "BYID Enrolled",
            "description": "Users with an active Beyond Identity passkey"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(group("byid-enrolled@co", "BYID Enrolled")))
        .expect(1)
        .mount(&mock.server)
        .await;

    let group = mock
        .directory()
        .ensure_group(
            "byid-enrolled@co",
            "BYID Enrolled",
            "Users with an active Beyond Identity passkey",
        )
        .await
        .unwrap();

    assert_eq!(group.display_name, "BYID Enrolled");
}

#[tokio::test]
async fn test_ensure_group_reads_existing() {
    let mock = MockWorkspace::start().await;
    mock.mock_group("byid-enrolled@co", "BYID Enrolled").await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock.server)
        .await;

    mock.directory()
        .ensure_group("byid-enrolled@co", "BYID Enrolled", "")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_create_conflict_reads_existing_group() {
    let mock = MockWorkspace::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{API_PREFIX}/groups")))
        .respond_with(ResponseTemplate::new(409).set_body_json(api_error(409, "Entity already exists.")))
        .mount(&mock.server)
        .await;
    mock.mock_group("byid-enrolled@co", "BYID Enrolled").await;

    let group = mock
        .client()
        .create_group("byid-enrolled@co", "BYID Enrolled", "")
        .await
        .unwrap();

    assert_eq!(group.email, "byid-enrolled@co");
}

#[tokio::test]
async fn test_rate_limit_and_server_errors_are_transient() {
    let mock = MockWorkspace::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{API_PREFIX}/groups/busy@co")))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "5"))
        .mount(&mock.server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{API_PREFIX}/groups/broken@co")))
        .respond_with(ResponseTemplate::new(500).set_body_json(api_error(500, "Backend Error")))
        .mount(&mock.server)
        .await;

    let directory = mock.directory();
    let busy = directory.get_group("busy@co").await.unwrap_err();
    assert_eq!(busy.retry_after_secs(), Some(5));
    assert!(busy.is_transient());

    match directory.get_group("broken@co").await.unwrap_err() {
        DirectoryError::Api { status, detail } => {
            assert_eq!(status, 500);
            assert_eq!(detail, "Backend Error");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_forbidden_is_auth_error() {
    let mock = MockWorkspace::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_json(api_error(403, "Not Authorized to access this resource/api")))
        .mount(&mock.server)
        .await;

    let error = mock.directory().get_group("eng@co").await.unwrap_err();

    assert!(matches!(error, DirectoryError::Auth(_)));
}
