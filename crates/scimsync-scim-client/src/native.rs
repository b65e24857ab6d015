//! Vendor native REST API, used only to read passkey status.
//!
//! The SCIM user record does not reliably expose whether a passkey is
//! active, so enrollment checks walk the native user listing and match on
//! email address.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::auth::ApiToken;
use crate::client::{classify_error, retry_after_secs};
use crate::error::{ScimClientError, ScimClientResult};

/// Default page size for user listing.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Upper bound on pages walked for one lookup.
const MAX_PAGES: u32 = 20;

/// One user as returned by the native API.
#[derive(Debug, Clone, Deserialize)]
pub struct NativeUser {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub email_address: String,
    #[serde(default)]
    pub has_active_passkey: bool,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NativeUserPage {
    #[serde(default)]
    users: Vec<NativeUser>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Client for the native user API.
#[derive(Debug, Clone)]
pub struct NativeClient {
    base_url: String,
    auth: ApiToken,
    http_client: Client,
    page_size: u32,
}

impl NativeClient {
    /// Create a new native API client with its own HTTP client.
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
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Override the listing page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Find a user by email (case-insensitive).
    pub async fn find_user(&self, email: &str) -> ScimClientResult<Option<NativeUser>> {
        let url = format!("{}/users", self.base_url);
        let mut page_token: Option<String> = None;

        for page in 0..MAX_PAGES {
            let mut request = self
                .auth
                .apply(self.http_client.get(&url))
                .header("Accept", "application/json")
                .query(&[("page_size", self.page_size.to_string())]);
            if let Some(token) = &page_token {
                request = request.query(&[("page_token", token)]);
            }
            debug!(url = %url, page, "Native API GET users");

            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                let retry_after = retry_after_secs(&response);
                let body = response.text().await.unwrap_or_default();
                return Err(classify_error(status, retry_after, body));
            }
            let page: NativeUserPage = response.json().await.map_err(|e| {
                ScimClientError::ParseError(format!("Failed to decode native API response: {e}"))
            })?;

            if let Some(user) = page
                .users
                .into_iter()
                .find(|u| u.email_address.eq_ignore_ascii_case(email))
            {
                return Ok(Some(user));
            }

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => return Ok(None),
            }
        }

        debug!(email, max_pages = MAX_PAGES, "Native API user not found within page limit");
        Ok(None)
    }

    /// Whether the user has an active passkey; unknown users have none.
    pub async fn has_active_passkey(&self, email: &str) -> ScimClientResult<bool> {
        Ok(self
            .find_user(email)
            .await?
            .is_some_and(|user| user.has_active_passkey))
    }
}
