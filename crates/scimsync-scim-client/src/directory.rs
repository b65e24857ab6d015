//! [`DownstreamDirectory`] over the SCIM and native clients.

use std::time::Duration;

use async_trait::async_trait;
use scimsync_reconcile::{
    DirectoryResult, DownstreamDirectory, DownstreamGroup, DownstreamUser, NewDownstreamUser,
};
use tracing::{debug, warn};

use crate::auth::ApiToken;
use crate::client::ScimClient;
use crate::error::ScimClientResult;
use crate::mapper::{new_user_resource, to_downstream_group, to_downstream_user};
use crate::models::ScimGroup;
use crate::native::{NativeClient, DEFAULT_PAGE_SIZE};

/// Connection settings for the downstream directory.
#[derive(Debug, Clone)]
pub struct ScimSettings {
    pub scim_base_url: String,
    pub native_api_url: String,
    pub api_token: ApiToken,
    pub timeout: Duration,
    pub native_page_size: u32,
}

impl ScimSettings {
    /// Settings with the default timeout and page size.
    pub fn new(
        scim_base_url: impl Into<String>,
        native_api_url: impl Into<String>,
        api_token: ApiToken,
    ) -> Self {
        Self {
            scim_base_url: scim_base_url.into(),
            native_api_url: native_api_url.into(),
            api_token,
            timeout: Duration::from_secs(30),
            native_page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Downstream directory backed by SCIM plus the native API.
#[derive(Debug, Clone)]
pub struct ScimDirectory {
    scim: ScimClient,
    native: NativeClient,
}

impl ScimDirectory {
    /// Combine pre-built clients.
    #[must_use]
    pub fn new(scim: ScimClient, native: NativeClient) -> Self {
        Self { scim, native }
    }

    /// Build both clients from settings, sharing one HTTP client.
    pub fn from_settings(settings: &ScimSettings) -> ScimClientResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .user_agent(concat!("scimsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                crate::ScimClientError::InvalidConfig(format!("Failed to build HTTP client: {e}"))
            })?;
        let scim = ScimClient::with_http_client(
            &settings.scim_base_url,
            settings.api_token.clone(),
            http_client.clone(),
        );
        let native = NativeClient::with_http_client(
            &settings.native_api_url,
            settings.api_token.clone(),
            http_client,
        )
        .with_page_size(settings.native_page_size);
        Ok(Self::new(scim, native))
    }

    /// The SCIM client.
    #[must_use]
    pub fn scim(&self) -> &ScimClient {
        &self.scim
    }

    /// The native API client.
    #[must_use]
    pub fn native(&self) -> &NativeClient {
        &self.native
    }
}

#[async_trait]
impl DownstreamDirectory for ScimDirectory {
    async fn find_group_by_display_name(
        &self,
        display_name: &str,
    ) -> DirectoryResult<Option<DownstreamGroup>> {
        match self.scim.find_group_by_display_name(display_name).await? {
            Some(group) => Ok(Some(to_downstream_group(group)?)),
            None => Ok(None),
        }
    }

    async fn create_group(&self, display_name: &str) -> DirectoryResult<DownstreamGroup> {
        let created = self.scim.create_group(&ScimGroup::new(display_name)).await?;
        Ok(to_downstream_group(created)?)
    }

    async fn find_user_by_address(&self, address: &str) -> DirectoryResult<Option<DownstreamUser>> {
        match self.scim.find_user_by_user_name(address).await? {
            Some(user) => Ok(Some(to_downstream_user(user)?)),
            None => Ok(None),
        }
    }

    async fn create_user(&self, user: &NewDownstreamUser) -> DirectoryResult<DownstreamUser> {
        let created = self.scim.create_user(&new_user_resource(user)).await?;
        Ok(to_downstream_user(created)?)
    }

    async fn get_group_members(&self, group_id: &str) -> DirectoryResult<Vec<String>> {
        let group = self.scim.get_group(group_id).await?;
        Ok(group.members.into_iter().map(|m| m.value).collect())
    }

    async fn patch_group_members(
        &self,
        group_id: &str,
        to_add: &[String],
        to_remove: &[String],
    ) -> DirectoryResult<()> {
        Ok(self
            .scim
            .patch_group_members(group_id, to_add, to_remove)
            .await?)
    }

    /// Active SCIM user with an active passkey per the native API.
    ///
    /// If the native API call fails the answer falls back to the SCIM
    /// `active` flag. This fail-open policy keeps a native API outage from
    /// emptying the enrollment group.
    async fn is_enrolled(&self, address: &str) -> DirectoryResult<bool> {
        let Some(user) = self.scim.find_user_by_user_name(address).await? else {
            debug!(address, "No downstream user, not enrolled");
            return Ok(false);
        };
        if !user.active {
            debug!(address, "Downstream user inactive, not enrolled");
            return Ok(false);
        }

        match self.native.has_active_passkey(address).await {
            Ok(has_passkey) => {
                debug!(address, has_passkey, "Native API passkey status");
                Ok(has_passkey)
            }
            Err(error) => {
                warn!(
                    address,
                    error = %error,
                    "Passkey status unavailable, falling back to active flag"
                );
                Ok(user.active)
            }
        }
    }
}
