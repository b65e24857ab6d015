//! scimsync - Google Workspace to Beyond Identity group provisioning
//!
//! - `run` performs one sweep and exits
//! - `serve` exposes the HTTP front-end and optional scheduler
//! - `validate-config` and `check` diagnose a deployment

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use scimsync::commands;
use scimsync::AppResult;

/// Sync Google Workspace groups to Beyond Identity over SCIM
#[derive(Parser)]
#[command(name = "scimsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (default: search standard locations)
    #[arg(short, long, global = true, env = "SCIMSYNC_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one sweep and exit
    Run(commands::run::RunArgs),

    /// Serve the HTTP API (and the scheduler when enabled)
    Serve(commands::serve::ServeArgs),

    /// Validate the configuration file
    ValidateConfig,

    /// Diagnose configuration and connectivity
    Check(commands::check::CheckArgs),

    /// Print version information
    Version,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> AppResult<()> {
    let config = cli.config.as_deref();
    match cli.command {
        Commands::Run(args) => commands::run::execute(args, config).await,
        Commands::Serve(args) => commands::serve::execute(args, config).await,
        Commands::ValidateConfig => commands::validate::execute(config),
        Commands::Check(args) => commands::check::execute(args, config).await,
        Commands::Version => {
            commands::version::execute();
            Ok(())
        }
    }
}
