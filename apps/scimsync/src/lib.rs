//! scimsync service: configuration, CLI commands, HTTP front-end and
//! scheduler around the reconciliation core.

pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod scheduler;
pub mod server;
pub mod wiring;

pub use config::Config;
pub use error::{AppError, AppResult};

/// Crate version reported by `/health`, `/version` and `scimsync version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
