//! `scimsync serve`: HTTP front-end with the optional scheduler.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use clap::Args;

use super::load_config;
use crate::error::{AppError, AppResult};
use crate::metrics::MetricsRegistry;
use crate::scheduler::Scheduler;
use crate::server::{self, AppState};
use crate::wiring::Directories;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Override server.host
    #[arg(long)]
    pub host: Option<String>,

    /// Override server.port
    #[arg(long)]
    pub port: Option<u16>,
}

pub async fn execute(args: ServeArgs, config_path: Option<&Path>) -> AppResult<()> {
    let mut config = load_config(config_path)?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.ensure_valid()?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| {
            AppError::Config(format!(
                "Invalid bind address {}:{}: {e}",
                config.server.host, config.server.port
            ))
        })?;

    let directories = Directories::from_config(&config)?;
    let coordinator = Arc::new(directories.coordinator(config.sync_options()));
    let metrics = Arc::new(MetricsRegistry::new());
    let groups: Arc<[String]> = config.sync.groups.clone().into();

    let scheduler = config.schedule_interval().map(|interval| {
        Arc::new(Scheduler::new(
            coordinator.clone(),
            groups.clone(),
            interval,
            metrics.clone(),
        ))
    });

    let state = AppState::new(coordinator, groups, metrics, scheduler);
    server::serve(addr, state).await
}
