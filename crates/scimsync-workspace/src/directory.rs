//! [`UpstreamDirectory`] over the Admin SDK.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use scimsync_reconcile::{DirectoryResult, UpstreamDirectory, UpstreamGroup, UpstreamMember};

use crate::auth::{ServiceAccountKey, WorkspaceCredentials};
use crate::client::{WorkspaceClient, DEFAULT_BASE_URL};
use crate::error::{WorkspaceError, WorkspaceResult};

/// Connection settings for the workspace directory.
#[derive(Debug, Clone)]
pub struct WorkspaceSettings {
    pub service_account_key_path: PathBuf,
    /// Administrator impersonated through domain-wide delegation.
    pub super_admin_email: String,
    pub base_url: String,
    /// Overrides the key file's `token_uri` when set.
    pub token_url: Option<String>,
    pub timeout: Duration,
}

impl WorkspaceSettings {
    #[must_use]
    pub fn new(
        service_account_key_path: impl Into<PathBuf>,
        super_admin_email: impl Into<String>,
    ) -> Self {
        Self {
            service_account_key_path: service_account_key_path.into(),
            super_admin_email: super_admin_email.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            token_url: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Google Workspace as the upstream directory.
#[derive(Debug, Clone)]
pub struct WorkspaceDirectory {
    client: WorkspaceClient,
}

impl WorkspaceDirectory {
    #[must_use]
    pub fn new(client: WorkspaceClient) -> Self {
        Self { client }
    }

    /// Load the service-account key and build the client.
    pub fn from_settings(settings: &WorkspaceSettings) -> WorkspaceResult<Self> {
        let mut key = ServiceAccountKey::from_file(&settings.service_account_key_path)?;
        if let Some(token_url) = &settings.token_url {
            key.token_uri.clone_from(token_url);
        }
        debug!(
            client_email = %key.client_email,
            subject = %settings.super_admin_email,
            "Loaded service account key"
        );
        let credentials = WorkspaceCredentials::ServiceAccount {
            key,
            subject: settings.super_admin_email.clone(),
        };

        let http_client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .user_agent(concat!("scimsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                WorkspaceError::InvalidConfig(format!("Failed to build HTTP client: {e}"))
            })?;
        let client = WorkspaceClient::with_http_client(&settings.base_url, credentials, http_client)?;
        Ok(Self::new(client))
    }

    #[must_use]
    pub fn client(&self) -> &WorkspaceClient {
        &self.client
    }
}

#[async_trait]
impl UpstreamDirectory for WorkspaceDirectory {
    async fn get_group(&self, address: &str) -> DirectoryResult<UpstreamGroup> {
        Ok(self.client.get_group(address).await?.into_upstream())
    }

    async fn get_group_members(&self, address: &str) -> DirectoryResult<Vec<UpstreamMember>> {
        let members = self.client.list_members(address).await?;
        Ok(members.into_iter().map(|m| m.into_upstream()).collect())
    }

    async fn ensure_group(
        &self,
        address: &str,
        display_name: &str,
        description: &str,
    ) -> DirectoryResult<UpstreamGroup> {
        let group = self
            .client
            .ensure_group(address, display_name, description)
            .await?;
        Ok(group.into_upstream())
    }

    async fn add_member(&self, group_address: &str, member_address: &str) -> DirectoryResult<()> {
        Ok(self.client.add_member(group_address, member_address).await?)
    }

    async fn remove_member(
        &self,
        group_address: &str,
        member_address: &str,
    ) -> DirectoryResult<()> {
        Ok(self
            .client
            .remove_member(group_address, member_address)
            .await?)
    }
}
