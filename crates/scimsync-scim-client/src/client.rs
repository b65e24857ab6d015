//! Thin reqwest wrapper over the Beyond Identity SCIM v2 endpoint.
//!
//! Covers the subset of RFC 7644 the reconciler needs: filtered user and
//! group search, create, group read and membership PATCH.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::auth::ApiToken;
use crate::error::{ScimClientError, ScimClientResult};
use crate::models::{
    ScimErrorBody, ScimGroup, ScimListResponse, ScimPatchOp, ScimPatchRequest, ScimUser,
    PATCH_OP_SCHEMA,
};

const SCIM_CONTENT_TYPE: &str = "application/scim+json";

/// The parts of `ServiceProviderConfig` the health check reports on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceProviderConfig {
    #[serde(default)]
    pub schemas: Vec<String>,

    #[serde(default)]
    pub patch: FeatureSupport,

    #[serde(default)]
    pub filter: FeatureSupport,
}

/// `{"supported": bool}` block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureSupport {
    pub supported: bool,
}

/// Outcome of probing `/ServiceProviderConfig`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub healthy: bool,
    pub checked_at: chrono::DateTime<chrono::Utc>,
    pub service_provider_config: Option<ServiceProviderConfig>,
    pub error: Option<String>,
}

/// SCIM 2.0 HTTP client.
#[derive(Debug, Clone)]
pub struct ScimClient {
    /// Base URL without trailing slash (e.g. `https://api.byndid.com/scim/v2`).
    base_url: String,
    auth: ApiToken,
    http_client: Client,
}

impl ScimClient {
    /// Create a new SCIM client with its own HTTP client.
    pub fn new(base_url: &str, auth: ApiToken, timeout: Duration) -> ScimClientResult<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("scimsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                ScimClientError::InvalidConfig(format!("Failed to build HTTP client: {e}"))
            })?;
        Ok(Self::with_http_client(base_url, auth, http_client))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    #[must_use]
    pub fn with_http_client(base_url: &str, auth: ApiToken, http_client: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            http_client,
        }
    }

    /// Get the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ── Discovery ─────────────────────────────────────────────────────

    /// Fetch the endpoint's `ServiceProviderConfig`.
    pub async fn discover_service_provider_config(
        &self,
    ) -> ScimClientResult<ServiceProviderConfig> {
        let url = format!("{}/ServiceProviderConfig", self.base_url);
        self.get(&url).await
    }

    /// Perform a health check on the endpoint.
    pub async fn health_check(&self) -> HealthCheckResult {
        let checked_at = chrono::Utc::now();
        let probe = self.discover_service_provider_config().await;
        match probe {
            Ok(config) => HealthCheckResult {
                healthy: true,
                checked_at,
                service_provider_config: Some(config),
                error: None,
            },
            Err(e) => HealthCheckResult {
                healthy: false,
                checked_at,
                service_provider_config: None,
                error: Some(e.to_string()),
            },
        }
    }

    // ── User Operations ───────────────────────────────────────────────

    /// Find a user by `userName` (GET /Users?filter=userName eq "...").
    pub async fn find_user_by_user_name(&self, user_name: &str) -> ScimClientResult<Option<ScimUser>> {
        let filter = format!("userName eq \"{}\"", escape_scim_filter_value(user_name));
        let url = format!("{}/Users", self.base_url);
        let response: ScimListResponse<ScimUser> = self.search(&url, &filter).await?;
        Ok(response.resources.into_iter().next())
    }

    /// Create a user (POST /Users).
    pub async fn create_user(&self, user: &ScimUser) -> ScimClientResult<ScimUser> {
        let url = format!("{}/Users", self.base_url);
        self.post(&url, user).await
    }

    // ── Group Operations ──────────────────────────────────────────────

    /// Find a group by `displayName` (GET /Groups?filter=displayName eq "...").
    pub async fn find_group_by_display_name(
        &self,
        display_name: &str,
    ) -> ScimClientResult<Option<ScimGroup>> {
        let filter = format!(
            "displayName eq \"{}\"",
            escape_scim_filter_value(display_name)
        );
        let url = format!("{}/Groups", self.base_url);
        let response: ScimListResponse<ScimGroup> = self.search(&url, &filter).await?;
        Ok(response.resources.into_iter().next())
    }

    /// Create a group (POST /Groups).
    pub async fn create_group(&self, group: &ScimGroup) -> ScimClientResult<ScimGroup> {
        let url = format!("{}/Groups", self.base_url);
        self.post(&url, group).await
    }

    /// Get a group with its members (GET /Groups/:id).
    pub async fn get_group(&self, id: &str) -> ScimClientResult<ScimGroup> {
        let url = format!("{}/Groups/{}", self.base_url, id);
        self.get(&url).await
    }

    /// Patch group members. Removals are sent before additions, as one
    /// `remove` per member followed by a single `add`.
    pub async fn patch_group_members(
        &self,
        group_id: &str,
        add_member_ids: &[String],
        remove_member_ids: &[String],
    ) -> ScimClientResult<()> {
        let patch = build_membership_patch(add_member_ids, remove_member_ids);
        if patch.operations.is_empty() {
            return Ok(());
        }

        let url = format!("{}/Groups/{}", self.base_url, group_id);
        debug!(
            url = %url,
            add = add_member_ids.len(),
            remove = remove_member_ids.len(),
            "SCIM PATCH"
        );
        let response = self
            .auth
            .apply(self.http_client.patch(&url))
            .header("Content-Type", SCIM_CONTENT_TYPE)
            .header("Accept", SCIM_CONTENT_TYPE)
            .json(&patch)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT || status.is_success() {
            Ok(())
        } else {
            self.handle_error_response(response).await
        }
    }

    // ── Internal HTTP Methods ─────────────────────────────────────────

    async fn search<T: DeserializeOwned>(&self, url: &str, filter: &str) -> ScimClientResult<T> {
        debug!(url, filter, "SCIM GET");
        let response = self
            .auth
            .apply(self.http_client.get(url))
            .header("Accept", SCIM_CONTENT_TYPE)
            .query(&[("filter", filter)])
            .send()
            .await?;
        self.handle_response(response).await
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> ScimClientResult<T> {
        debug!(url, "SCIM GET");
        let response = self
            .auth
            .apply(self.http_client.get(url))
            .header("Accept", SCIM_CONTENT_TYPE)
            .send()
            .await?;
        self.handle_response(response).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> ScimClientResult<T> {
        debug!(url, "SCIM POST");
        let response = self
            .auth
            .apply(self.http_client.post(url))
            .header("Content-Type", SCIM_CONTENT_TYPE)
            .header("Accept", SCIM_CONTENT_TYPE)
            .json(body)
            .send()
            .await?;
        self.handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> ScimClientResult<T> {
        if response.status().is_success() {
            let body = response.text().await?;
            serde_json::from_str(&body)
                .map_err(|e| ScimClientError::ParseError(format!("Failed to parse response: {e}")))
        } else {
            self.handle_error_response(response).await
        }
    }

    async fn handle_error_response<T>(&self, response: reqwest::Response) -> ScimClientResult<T> {
        let status = response.status();
        let retry_after = retry_after_secs(&response);
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        Err(classify_error(status, retry_after, body))
    }
}

/// Map a non-success response to an error.
pub(crate) fn classify_error(
    status: StatusCode,
    retry_after: Option<u64>,
    body: String,
) -> ScimClientError {
    // Prefer the SCIM `detail` when the body is a SCIM error document.
    let detail = serde_json::from_str::<ScimErrorBody>(&body)
        .ok()
        .and_then(|e| e.detail)
        .unwrap_or(body);

    match status {
        StatusCode::NOT_FOUND => ScimClientError::NotFound(detail),
        StatusCode::CONFLICT => ScimClientError::Conflict(detail),
        StatusCode::TOO_MANY_REQUESTS => {
            warn!(retry_after_secs = ?retry_after, "Downstream API rate limited");
            ScimClientError::RateLimited {
                retry_after_secs: retry_after,
            }
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ScimClientError::AuthError(format!("Authentication failed ({status}): {detail}"))
        }
        _ => {
            let detail = if detail.is_empty() {
                format!("HTTP {status}")
            } else {
                detail
            };
            ScimClientError::ScimError {
                status: status.as_u16(),
                detail,
            }
        }
    }
}

pub(crate) fn retry_after_secs(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get("Retry-After")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}

/// Build the membership PATCH body: removals first, then one add.
#[must_use]
pub fn build_membership_patch(add_member_ids: &[String], remove_member_ids: &[String]) -> ScimPatchRequest {
    let mut operations: Vec<ScimPatchOp> = remove_member_ids
        .iter()
        .map(|id| ScimPatchOp {
            op: "remove".to_string(),
            path: Some(format!(
                "members[value eq \"{}\"]",
                escape_scim_filter_value(id)
            )),
            value: None,
        })
        .collect();

    if !add_member_ids.is_empty() {
        let members: Vec<serde_json::Value> = add_member_ids
            .iter()
            .map(|id| json!({ "value": id }))
            .collect();
        operations.push(ScimPatchOp {
            op: "add".to_string(),
            path: Some("members".to_string()),
            value: Some(serde_json::Value::Array(members)),
        });
    }

    ScimPatchRequest {
        schemas: vec![PATCH_OP_SCHEMA.to_string()],
        operations,
    }
}

/// Quote-safe form of `value` for a `"..."` literal in a SCIM filter.
///
/// Only `\` and `"` need escaping (RFC 7644 3.4.2.2).
#[must_use]
pub fn escape_scim_filter_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_filter_value() {
        assert_eq!(escape_scim_filter_value("alice@co"), "alice@co");
        assert_eq!(escape_scim_filter_value(r#"a"b\c"#), r#"a\"b\\c"#);
    }

    #[test]
    fn test_patch_orders_removes_before_add() {
        let patch = build_membership_patch(
            &["u-2".to_string(), "u-3".to_string()],
            &["u-9".to_string()],
        );
        let ops: Vec<&str> = patch.operations.iter().map(|op| op.op.as_str()).collect();
        assert_eq!(ops, vec!["remove", "add"]);
        assert_eq!(patch.operations[0].path.as_deref(), Some(r#"members[value eq "u-9"]"#));
        assert_eq!(
            patch.operations[1].value,
            Some(json!([{ "value": "u-2" }, { "value": "u-3" }]))
        );
        assert_eq!(patch.schemas, vec![PATCH_OP_SCHEMA.to_string()]);
    }

    #[test]
    fn test_empty_patch_has_no_operations() {
        assert!(build_membership_patch(&[], &[]).operations.is_empty());
    }

    #[test]
    fn test_classify_prefers_scim_detail() {
        let body = r#"{"schemas":["urn:ietf:params:scim:api:messages:2.0:Error"],"detail":"userName taken","status":"409"}"#;
        match classify_error(StatusCode::CONFLICT, None, body.to_string()) {
            ScimClientError::Conflict(detail) => assert_eq!(detail, "userName taken"),
            other => panic!("expected Conflict, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_forbidden_as_auth() {
        let error = classify_error(StatusCode::FORBIDDEN, None, "nope".to_string());
        assert!(matches!(error, ScimClientError::AuthError(_)));
    }

    #[test]
    fn test_classify_empty_body_uses_status() {
        match classify_error(StatusCode::BAD_GATEWAY, None, String::new()) {
            ScimClientError::ScimError { status, detail } => {
                assert_eq!(status, 502);
                assert!(detail.contains("502"));
            }
            other => panic!("expected ScimError, got {other:?}"),
        }
    }
}
