//! Admin SDK Directory API client (groups and members).

use std::time::Duration;

use reqwest::{Client, Method, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::auth::{WorkspaceAuth, WorkspaceCredentials};
use crate::error::{WorkspaceError, WorkspaceResult};
use crate::models::{ApiErrorBody, Group, Member, MemberPage};

/// Production Directory API root.
pub const DEFAULT_BASE_URL: &str = "https://admin.googleapis.com/admin/directory/v1";

/// Page size for `members.list` (the API maximum).
pub const MEMBERS_PAGE_SIZE: u32 = 200;

/// Upper bound on `members.list` pages walked for one group.
pub const DEFAULT_MAX_MEMBER_PAGES: u32 = 500;

/// Admin SDK client.
#[derive(Debug, Clone)]
pub struct WorkspaceClient {
    base_url: Url,
    auth: WorkspaceAuth,
    http_client: Client,
    max_member_pages: u32,
}

impl WorkspaceClient {
    /// Create a client against the production API with its own HTTP client.
    pub fn new(credentials: WorkspaceCredentials, timeout: Duration) -> WorkspaceResult<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("scimsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                WorkspaceError::InvalidConfig(format!("Failed to build HTTP client: {e}"))
            })?;
        Self::with_http_client(DEFAULT_BASE_URL, credentials, http_client)
    }

    /// Create a client against `base_url` with a pre-built HTTP client.
    pub fn with_http_client(
        base_url: &str,
        credentials: WorkspaceCredentials,
        http_client: Client,
    ) -> WorkspaceResult<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| WorkspaceError::InvalidConfig(format!("Invalid base URL {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(WorkspaceError::InvalidConfig(format!(
                "Base URL cannot carry a path: {base_url}"
            )));
        }

        Ok(Self {
            base_url,
            auth: WorkspaceAuth::new(credentials, http_client.clone()),
            http_client,
            max_member_pages: DEFAULT_MAX_MEMBER_PAGES,
        })
    }

    /// Override the page limit for member listings.
    #[must_use]
    pub fn with_max_member_pages(mut self, max_pages: u32) -> Self {
        self.max_member_pages = max_pages.max(1);
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Groups ────────────────────────────────────────────────────────

    /// `groups.get`.
    pub async fn get_group(&self, group_key: &str) -> WorkspaceResult<Group> {
        let url = self.endpoint(&["groups", group_key])?;
        self.send(Method::GET, url, None::<&()>).await
    }

    /// `groups.insert`. A conflict returns the existing group.
    pub async fn create_group(
        &self,
        email: &str,
        name: &str,
        description: &str,
    ) -> WorkspaceResult<Group> {
        let url = self.endpoint(&["groups"])?;
        let body = Group {
            id: None,
            email: email.to_string(),
            name: name.to_string(),
            description: description.to_string(),
        };
        match self.send(Method::POST, url, Some(&body)).await {
            Err(WorkspaceError::Conflict(_)) => {
                debug!(group = email, "Group already exists, reading it");
                self.get_group(email).await
            }
            other => other,
        }
    }

    /// Read a group, creating it when absent.
    pub async fn ensure_group(
        &self,
        email: &str,
        name: &str,
        description: &str,
    ) -> WorkspaceResult<Group> {
        match self.get_group(email).await {
            Err(WorkspaceError::NotFound(_)) => self.create_group(email, name, description).await,
            other => other,
        }
    }

    // ── Members ───────────────────────────────────────────────────────

    /// `members.list`, following page tokens. A group the API reports as
    /// missing is treated as having no members. A listing still paging
    /// after `max_member_pages` fails rather than returning a partial set.
    pub async fn list_members(&self, group_key: &str) -> WorkspaceResult<Vec<Member>> {
        let mut members = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..self.max_member_pages {
            let mut url = self.endpoint(&["groups", group_key, "members"])?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("maxResults", &MEMBERS_PAGE_SIZE.to_string());
                if let Some(token) = &page_token {
                    query.append_pair("pageToken", token);
                }
            }

            let page: MemberPage = match self.send(Method::GET, url, None::<&()>).await {
                Ok(page) => page,
                Err(WorkspaceError::NotFound(_)) => {
                    debug!(group = group_key, "Members listing not found, treating as empty");
                    return Ok(members);
                }
                Err(e) => return Err(e),
            };
            members.extend(page.members);

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => return Ok(members),
            }
        }

        warn!(
            group = group_key,
            max_pages = self.max_member_pages,
            "Members listing exceeded page limit"
        );
        Err(WorkspaceError::PageLimitExceeded {
            group: group_key.to_string(),
            max_pages: self.max_member_pages,
        })
    }

    /// `members.insert`. Already being a member is success.
    pub async fn add_member(&self, group_key: &str, member_email: &str) -> WorkspaceResult<()> {
        let url = self.endpoint(&["groups", group_key, "members"])?;
        match self
            .send::<serde_json::Value, _>(Method::POST, url, Some(&Member::new_user(member_email)))
            .await
        {
            Ok(_) => Ok(()),
            Err(WorkspaceError::Conflict(_)) => {
                debug!(group = group_key, member = member_email, "Already a member");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// `members.delete`. Not being a member is success.
    pub async fn remove_member(&self, group_key: &str, member_email: &str) -> WorkspaceResult<()> {
        let url = self.endpoint(&["groups", group_key, "members", member_email])?;
        match self.send_empty(Method::DELETE, url).await {
            Err(WorkspaceError::NotFound(_)) => {
                debug!(group = group_key, member = member_email, "Not a member");
                Ok(())
            }
            other => other,
        }
    }

    // ── Internal HTTP Methods ─────────────────────────────────────────

    fn endpoint(&self, segments: &[&str]) -> WorkspaceResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                WorkspaceError::InvalidConfig(format!("Base URL cannot carry a path: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn request<B: Serialize>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> WorkspaceResult<Response> {
        debug!(method = %method, url = %url, "Admin SDK request");
        let mut builder = self
            .auth
            .apply(self.http_client.request(method, url))
            .await?
            .header("Accept", "application/json");
        if let Some(body) = body {
            builder = builder.json(body);
        }
        Ok(builder.send().await?)
    }

    async fn send<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> WorkspaceResult<T> {
        let response = self.request(method, url, body).await?;
        if response.status().is_success() {
            response.json().await.map_err(|e| {
                WorkspaceError::ParseError(format!("Failed to decode Admin SDK response: {e}"))
            })
        } else {
            Err(self.error_from(response).await)
        }
    }

    async fn send_empty(&self, method: Method, url: Url) -> WorkspaceResult<()> {
        let response = self.request(method, url, None::<&()>).await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(self.error_from(response).await)
        }
    }

    async fn error_from(&self, response: Response) -> WorkspaceError {
        let status = response.status();
        let url = response.url().to_string();
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|e| e.error.message)
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or(body);

        match status {
            StatusCode::NOT_FOUND => WorkspaceError::NotFound(url),
            StatusCode::CONFLICT => WorkspaceError::Conflict(message),
            StatusCode::TOO_MANY_REQUESTS => {
                warn!(retry_after_secs = ?retry_after, "Admin SDK rate limited");
                WorkspaceError::RateLimited {
                    retry_after_secs: retry_after,
                }
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                self.auth.invalidate_cache().await;
                WorkspaceError::AuthError(format!("Admin SDK returned {status}: {message}"))
            }
            _ => WorkspaceError::ApiError {
                status: status.as_u16(),
                message: if message.is_empty() {
                    format!("HTTP {status}")
                } else {
                    message
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> WorkspaceClient {
        WorkspaceClient::with_http_client(
            base,
            WorkspaceCredentials::AccessToken("t".into()),
            Client::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_endpoint_joins_segments() {
        let client = client("https://admin.example.com/admin/directory/v1/");
        let url = client.endpoint(&["groups", "eng@co", "members", "a b@co"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://admin.example.com/admin/directory/v1/groups/eng@co/members/a%20b@co"
        );
    }

    #[test]
    fn test_segments_cannot_escape_path() {
        let client = client("https://admin.example.com/v1");
        let url = client.endpoint(&["groups", "../x?y"]).unwrap();
        assert_eq!(url.path(), "/v1/groups/..%2Fx%3Fy");
    }

    #[test]
    fn test_invalid_base_url() {
        let result = WorkspaceClient::with_http_client(
            "not a url",
            WorkspaceCredentials::AccessToken("t".into()),
            Client::new(),
        );
        assert!(matches!(result, Err(WorkspaceError::InvalidConfig(_))));
    }
}
