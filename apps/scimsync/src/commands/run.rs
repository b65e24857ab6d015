//! `scimsync run`: one sweep, then exit.

use std::path::Path;

use clap::Args;
use tracing::info;

use scimsync_reconcile::RunReport;

use super::load_config;
use crate::error::{AppError, AppResult};
use crate::wiring::Directories;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Read both directories but write nothing
    #[arg(long)]
    pub test_mode: bool,
}

pub async fn execute(args: RunArgs, config_path: Option<&Path>) -> AppResult<()> {
    let mut config = load_config(config_path)?;
    if args.test_mode {
        config.app.test_mode = true;
    }
    config.ensure_valid()?;

    let directories = Directories::from_config(&config)?;
    let coordinator = directories.coordinator(config.sync_options());
    if config.app.test_mode {
        info!("Test mode: no changes will be written");
    }

    let report = coordinator.run(&config.sync.groups).await?;
    print_summary(&report);

    if report.is_success() {
        Ok(())
    } else {
        Err(AppError::SweepErrors(report.errors.len()))
    }
}

fn print_summary(report: &RunReport) {
    let mode = if report.test_mode { " (test mode)" } else { "" };
    println!();
    println!("Sweep {}{mode}", report.run_id);
    println!("  Groups processed:     {}", report.stats.groups_processed);
    println!("  Groups created:       {}", report.stats.groups_created);
    println!("  Users created:        {}", report.stats.users_created);
    println!("  Memberships added:    {}", report.stats.memberships_added);
    println!("  Memberships removed:  {}", report.stats.memberships_removed);
    println!(
        "  Duration:             {:.1}s",
        report.duration().num_milliseconds() as f64 / 1000.0
    );

    if !report.errors.is_empty() {
        println!();
        println!("Errors ({}):", report.errors.len());
        for error in &report.errors {
            println!("  - {error}");
        }
    }
    println!();
}
