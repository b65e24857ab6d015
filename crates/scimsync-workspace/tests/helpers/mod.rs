//! Wiremock fixtures for the Admin SDK and its token endpoint.

#![allow(dead_code)]

use std::path::PathBuf;

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scimsync_workspace::{ServiceAccountKey, WorkspaceClient, WorkspaceCredentials, WorkspaceDirectory};

pub const ACCESS_TOKEN: &str = "ya29.test-access-token";
pub const API_PREFIX: &str = "/admin/directory/v1";

pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub struct MockWorkspace {
    pub server: MockServer,
}

impl MockWorkspace {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn base_url(&self) -> String {
        format!("{}{API_PREFIX}", self.server.uri())
    }

    pub fn token_uri(&self) -> String {
        format!("{}/token", self.server.uri())
    }

    /// Client authenticated with a static access token.
    pub fn client(&self) -> WorkspaceClient {
        WorkspaceClient::with_http_client(
            &self.base_url(),
            WorkspaceCredentials::AccessToken(ACCESS_TOKEN.to_string()),
            reqwest::Client::new(),
        )
        .unwrap()
    }

    /// Client authenticated with the fixture service account, exchanging
    /// assertions at this server's token endpoint.
    pub fn service_account_client(&self, subject: &str) -> WorkspaceClient {
        let mut key = ServiceAccountKey::from_file(fixture("service_account.json")).unwrap();
        key.token_uri = self.token_uri();
        WorkspaceClient::with_http_client(
            &self.base_url(),
            WorkspaceCredentials::ServiceAccount {
                key,
                subject: subject.to_string(),
            },
            reqwest::Client::new(),
        )
        .unwrap()
    }

    pub fn directory(&self) -> WorkspaceDirectory {
        WorkspaceDirectory::new(self.client())
    }

    pub async fn mock_token(&self, expires_in: u64, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": ACCESS_TOKEN,
                "token_type": "Bearer",
                "expires_in": expires_in
            })))
            .expect(expected_calls)
            .mount(&self.server)
            .await;
    }

    pub async fn mock_group(&self, email: &str, name: &str) {
        Mock::given(method("GET"))
            .and(path(format!("{API_PREFIX}/groups/{email}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(group(email, name)))
            .mount(&self.server)
            .await;
    }
}

pub fn group(email: &str, name: &str) -> Value {
    json!({
        "kind": "admin#directory#group",
        "id": format!("id-{email}"),
        "email": email,
        "name": name,
        "description": ""
    })
}

pub fn member(email: &str, member_type: &str, status: &str) -> Value {
    json!({
        "kind": "admin#directory#member",
        "id": format!("id-{email}"),
        "email": email,
        "role": "MEMBER",
        "type": member_type,
        "status": status
    })
}

pub fn api_error(code: u16, message: &str) -> Value {
    json!({ "error": { "code": code, "message": message, "errors": [] } })
}
