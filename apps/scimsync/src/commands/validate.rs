//! `scimsync validate-config`: report every configuration problem.

use std::path::Path;

use crate::config::Config;
use crate::error::{AppError, AppResult};

pub fn execute(config_path: Option<&Path>) -> AppResult<()> {
    let (config, path) = Config::discover(config_path)?;
    let issues = config.validate();

    if issues.is_empty() {
        println!("✓ {} is valid", path.display());
        println!("  {} group(s) configured", config.sync.groups.len());
        println!(
            "  Enrollment group: {}",
            config.enrollment_group().address
        );
        return Ok(());
    }

    println!("✗ {} has {} problem(s):", path.display(), issues.len());
    for issue in &issues {
        println!("  - {issue}");
    }
    Err(AppError::Validation(issues))
}
