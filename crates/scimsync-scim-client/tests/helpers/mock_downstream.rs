//! Wiremock fixtures for the SCIM and native endpoints.
//!
//! The mock serves SCIM under `/scim/v2` and the native API under `/v2`,
//! matching the production URL layout.

#![allow(dead_code)]

use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scimsync_scim_client::auth::ApiToken;
use scimsync_scim_client::client::ScimClient;
use scimsync_scim_client::native::NativeClient;
use scimsync_scim_client::ScimDirectory;

pub const TOKEN: &str = "test-token-123";

pub struct MockDownstream {
    pub server: MockServer,
}

impl MockDownstream {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn scim_url(&self) -> String {
        format!("{}/scim/v2", self.server.uri())
    }

    pub fn native_url(&self) -> String {
        format!("{}/v2", self.server.uri())
    }

    pub fn scim_client(&self) -> ScimClient {
        ScimClient::with_http_client(&self.scim_url(), ApiToken::new(TOKEN), reqwest::Client::new())
    }

    pub fn native_client(&self) -> NativeClient {
        NativeClient::with_http_client(
            &self.native_url(),
            ApiToken::new(TOKEN),
            reqwest::Client::new(),
        )
    }

    pub fn directory(&self) -> ScimDirectory {
        ScimDirectory::new(self.scim_client(), self.native_client())
    }

    /// `GET /Users?filter=userName eq "<address>"` returning the given users.
    pub async fn mock_user_search(&self, address: &str, resources: Vec<Value>) {
        Mock::given(method("GET"))
            .and(path("/scim/v2/Users"))
            .and(query_param("filter", format!("userName eq \"{address}\"")))
            .and(header("Authorization", format!("Bearer {TOKEN}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(list_response(resources)))
            .mount(&self.server)
            .await;
    }

    /// `GET /Groups?filter=displayName eq "<name>"` returning the given groups.
    pub async fn mock_group_search(&self, display_name: &str, resources: Vec<Value>) {
        Mock::given(method("GET"))
            .and(path("/scim/v2/Groups"))
            .and(query_param("filter", format!("displayName eq \"{display_name}\"")))
            .respond_with(ResponseTemplate::new(200).set_body_json(list_response(resources)))
            .mount(&self.server)
            .await;
    }

    /// Native `GET /users` returning one page.
    pub async fn mock_native_users(&self, users: Vec<Value>) {
        Mock::given(method("GET"))
            .and(path("/v2/users"))
            .and(query_param("page_size", "50"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "users": users,
                "total_size": 0
            })))
            .mount(&self.server)
            .await;
    }

    /// Native `GET /users` failing with the given status.
    pub async fn mock_native_failure(&self, status: u16) {
        Mock::given(method("GET"))
            .and(path("/v2/users"))
            .respond_with(ResponseTemplate::new(status).set_body_string("native api down"))
            .mount(&self.server)
            .await;
    }
}

pub fn list_response(resources: Vec<Value>) -> Value {
    json!({
        "schemas": ["urn:ietf:params:scim:api:messages:2.0:ListResponse"],
        "totalResults": resources.len(),
        "Resources": resources
    })
}

pub fn scim_user(id: &str, user_name: &str, active: bool) -> Value {
    json!({
        "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
        "id": id,
        "externalId": user_name,
        "userName": user_name,
        "displayName": "Test User",
        "emails": [{ "value": user_name, "type": "work", "primary": true }],
        "active": active
    })
}

pub fn native_user(email: &str, has_active_passkey: bool) -> Value {
    json!({
        "id": format!("native-{email}"),
        "email_address": email,
        "has_active_passkey": has_active_passkey,
        "state": "ACTIVE"
    })
}
