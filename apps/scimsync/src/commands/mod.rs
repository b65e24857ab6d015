//! CLI subcommands.

pub mod check;
pub mod run;
pub mod serve;
pub mod validate;
pub mod version;

use std::path::Path;

use tracing::info;

use crate::config::Config;
use crate::error::AppResult;
use crate::logging::{init_logging, LogFormat};

/// Load configuration and install logging from its `app` section.
pub(crate) fn load_config(path: Option<&Path>) -> AppResult<Config> {
    let (config, path) = Config::discover(path)?;
    init_logging(&config.app.log_level, LogFormat::parse(&config.app.log_format));
    info!(path = %path.display(), "Loaded configuration");
    Ok(config)
}
