//! Builds the directory adapters and the coordinator from configuration.

use std::sync::Arc;

use scimsync_reconcile::{DirectoryError, RunCoordinator, SyncOptions};
use scimsync_scim_client::ScimDirectory;
use scimsync_workspace::WorkspaceDirectory;
use tracing::info;

use crate::config::Config;
use crate::error::{AppError, AppResult};

/// Both directory adapters, built once per process.
#[derive(Debug, Clone)]
pub struct Directories {
    pub upstream: Arc<WorkspaceDirectory>,
    pub downstream: Arc<ScimDirectory>,
}

impl Directories {
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let upstream = WorkspaceDirectory::from_settings(&config.workspace_settings())
            .map_err(|e| AppError::Init {
                component: "Google Workspace client",
                source: DirectoryError::from(e),
            })?;
        let downstream = ScimDirectory::from_settings(&config.scim_settings()).map_err(|e| {
            AppError::Init {
                component: "Beyond Identity client",
                source: DirectoryError::from(e),
            }
        })?;

        info!(
            domain = %config.google_workspace.domain,
            scim_base_url = %config.beyond_identity.scim_base_url,
            "Directory clients initialized"
        );
        Ok(Self {
            upstream: Arc::new(upstream),
            downstream: Arc::new(downstream),
        })
    }

    #[must_use]
    pub fn coordinator(&self, options: SyncOptions) -> RunCoordinator {
        RunCoordinator::new(self.upstream.clone(), self.downstream.clone(), options)
    }
}
