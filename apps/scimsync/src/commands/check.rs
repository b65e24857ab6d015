//! `scimsync check`: connectivity and configuration diagnostics.

use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;

use scimsync_scim_client::ScimDirectory;
use scimsync_workspace::WorkspaceDirectory;

use crate::config::Config;
use crate::error::{AppError, AppResult};

const RESET: &str = "\x1b[0m";

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticStatus {
    Pass,
    Warn,
    Fail,
    Skip,
}

impl DiagnosticStatus {
    fn symbol(self) -> &'static str {
        match self {
            Self::Pass => "✓",
            Self::Warn => "!",
            Self::Fail => "✗",
            Self::Skip => "-",
        }
    }

    fn display(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Warn => "WARN",
            Self::Fail => "FAIL",
            Self::Skip => "SKIP",
        }
    }

    fn color(self) -> &'static str {
        match self {
            Self::Pass => "\x1b[32m",
            Self::Warn => "\x1b[33m",
            Self::Fail => "\x1b[31m",
            Self::Skip => "\x1b[90m",
        }
    }
}

/// One diagnostic line.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticCheck {
    pub id: &'static str,
    pub display_name: &'static str,
    pub status: DiagnosticStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl DiagnosticCheck {
    fn new(
        id: &'static str,
        display_name: &'static str,
        status: DiagnosticStatus,
        message: impl Into<String>,
        suggestion: Option<&str>,
    ) -> Self {
        Self {
            id,
            display_name,
            status,
            message: message.into(),
            suggestion: suggestion.map(str::to_string),
        }
    }

    pub fn pass(id: &'static str, display_name: &'static str, message: impl Into<String>) -> Self {
        Self::new(id, display_name, DiagnosticStatus::Pass, message, None)
    }

    pub fn warn(
        id: &'static str,
        display_name: &'static str,
        message: impl Into<String>,
        suggestion: Option<&str>,
    ) -> Self {
        Self::new(id, display_name, DiagnosticStatus::Warn, message, suggestion)
    }

    pub fn fail(
        id: &'static str,
        display_name: &'static str,
        message: impl Into<String>,
        suggestion: &str,
    ) -> Self {
        Self::new(id, display_name, DiagnosticStatus::Fail, message, Some(suggestion))
    }

    pub fn skip(id: &'static str, display_name: &'static str, message: impl Into<String>) -> Self {
        Self::new(id, display_name, DiagnosticStatus::Skip, message, None)
    }
}

/// All checks plus the worst status among them.
#[derive(Debug, Serialize)]
pub struct DiagnosticReport {
    pub checks: Vec<DiagnosticCheck>,
    pub overall_status: DiagnosticStatus,
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
}

impl DiagnosticReport {
    #[must_use]
    pub fn new(checks: Vec<DiagnosticCheck>) -> Self {
        let has = |status| checks.iter().any(|c| c.status == status);
        let overall_status = if has(DiagnosticStatus::Fail) {
            DiagnosticStatus::Fail
        } else if has(DiagnosticStatus::Warn) {
            DiagnosticStatus::Warn
        } else if checks.iter().all(|c| c.status == DiagnosticStatus::Skip) {
            DiagnosticStatus::Skip
        } else {
            DiagnosticStatus::Pass
        };
        Self {
            checks,
            overall_status,
            version: crate::VERSION,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn fail_count(&self) -> usize {
        self.checks
            .iter()
            .filter(|c| c.status == DiagnosticStatus::Fail)
            .count()
    }
}

// ── Checks ─────────────────────────────────────────────────────────────

fn check_configuration(loaded: &AppResult<(Config, std::path::PathBuf)>) -> DiagnosticCheck {
    match loaded {
        Ok((config, path)) => {
            let issues = config.validate();
            if issues.is_empty() {
                DiagnosticCheck::pass(
                    "configuration",
                    "Configuration",
                    format!("{} found and valid", path.display()),
                )
            } else {
                let listed = issues.iter().map(ToString::to_string).collect::<Vec<_>>();
                DiagnosticCheck::fail(
                    "configuration",
                    "Configuration",
                    listed.join("; "),
                    "Run `scimsync validate-config` for details",
                )
            }
        }
        Err(e) => DiagnosticCheck::fail(
            "configuration",
            "Configuration",
            e.to_string(),
            "Pass --config <path> or create config.yaml",
        ),
    }
}

async fn probe_groups(upstream: &WorkspaceDirectory, groups: &[String]) -> anyhow::Result<usize> {
    for address in groups {
        upstream
            .client()
            .get_group(address)
            .await
            .with_context(|| format!("reading {address}"))?;
    }
    Ok(groups.len())
}

async fn check_upstream(config: &Config) -> Vec<DiagnosticCheck> {
    let upstream = match WorkspaceDirectory::from_settings(&config.workspace_settings()) {
        Ok(upstream) => upstream,
        Err(e) => {
            return vec![
                DiagnosticCheck::fail(
                    "service_account",
                    "Service Account",
                    e.to_string(),
                    "Check google_workspace.service_account_key_path",
                ),
                DiagnosticCheck::skip(
                    "upstream_groups",
                    "Workspace Groups",
                    "Skipped - no credentials",
                ),
                DiagnosticCheck::skip(
                    "enrollment_group",
                    "Enrollment Group",
                    "Skipped - no credentials",
                ),
            ];
        }
    };

    let mut checks = vec![DiagnosticCheck::pass(
        "service_account",
        "Service Account",
        format!("Key loaded, impersonating {}", config.google_workspace.super_admin_email),
    )];

    checks.push(match probe_groups(&upstream, &config.sync.groups).await {
        Ok(count) => DiagnosticCheck::pass(
            "upstream_groups",
            "Workspace Groups",
            format!("{count} group(s) readable"),
        ),
        Err(e) => DiagnosticCheck::fail(
            "upstream_groups",
            "Workspace Groups",
            format!("{e:#}"),
            "Check domain-wide delegation scopes and sync.groups",
        ),
    });

    let enrollment = config.enrollment_group();
    checks.push(match upstream.client().get_group(&enrollment.address).await {
        Ok(_) => DiagnosticCheck::pass(
            "enrollment_group",
            "Enrollment Group",
            format!("{} exists", enrollment.address),
        ),
        Err(e) if e.is_not_found() => DiagnosticCheck::warn(
            "enrollment_group",
            "Enrollment Group",
            format!("{} does not exist yet", enrollment.address),
            Some("It is created on the first sweep"),
        ),
        Err(e) => DiagnosticCheck::fail(
            "enrollment_group",
            "Enrollment Group",
            e.to_string(),
            "Check the admin.directory.group scope",
        ),
    });

    checks
}

async fn check_downstream(config: &Config) -> Vec<DiagnosticCheck> {
    let downstream = match ScimDirectory::from_settings(&config.scim_settings()) {
        Ok(downstream) => downstream,
        Err(e) => {
            return vec![
                DiagnosticCheck::fail(
                    "scim_endpoint",
                    "SCIM Endpoint",
                    e.to_string(),
                    "Check beyond_identity settings",
                ),
                DiagnosticCheck::skip("native_api", "Native API", "Skipped - no client"),
            ];
        }
    };

    let health = downstream.scim().health_check().await;
    let scim = if health.healthy {
        DiagnosticCheck::pass(
            "scim_endpoint",
            "SCIM Endpoint",
            format!("Connected to {}", config.beyond_identity.scim_base_url),
        )
    } else {
        DiagnosticCheck::fail(
            "scim_endpoint",
            "SCIM Endpoint",
            health.error.unwrap_or_else(|| "unhealthy".to_string()),
            "Check beyond_identity.scim_base_url and api_token",
        )
    };

    let admin = &config.google_workspace.super_admin_email;
    let native = match downstream
        .native()
        .find_user(admin)
        .await
        .with_context(|| format!("looking up {admin}"))
    {
        Ok(_) => DiagnosticCheck::pass(
            "native_api",
            "Native API",
            format!("Connected to {}", config.beyond_identity.native_api_url),
        ),
        Err(e) => DiagnosticCheck::fail(
            "native_api",
            "Native API",
            format!("{e:#}"),
            "Check beyond_identity.native_api_url",
        ),
    };

    vec![scim, native]
}

/// Run every check. Remote checks are skipped when configuration is unusable.
pub async fn run_all_checks(config_path: Option<&Path>) -> DiagnosticReport {
    let loaded = Config::discover(config_path);
    let config_check = check_configuration(&loaded);
    let config_ok = config_check.status == DiagnosticStatus::Pass;
    let mut checks = vec![config_check];

    match loaded {
        Ok((config, _)) if config_ok => {
            checks.extend(check_upstream(&config).await);
            checks.extend(check_downstream(&config).await);
        }
        _ => {
            for (id, name) in [
                ("service_account", "Service Account"),
                ("upstream_groups", "Workspace Groups"),
                ("enrollment_group", "Enrollment Group"),
                ("scim_endpoint", "SCIM Endpoint"),
                ("native_api", "Native API"),
            ] {
                checks.push(DiagnosticCheck::skip(id, name, "Skipped - configuration failed"));
            }
        }
    }

    DiagnosticReport::new(checks)
}

fn print_report(report: &DiagnosticReport) {
    let use_color = std::env::var("NO_COLOR").is_err();

    println!();
    println!("scimsync check");
    println!("═══════════════════════════════════════════════════════");
    println!();

    for check in &report.checks {
        let status_display = if use_color {
            format!(
                "{}{} {}{}",
                check.status.color(),
                check.status.symbol(),
                check.status.display(),
                RESET
            )
        } else {
            format!("{} {}", check.status.symbol(), check.status.display())
        };

        println!(
            "  {:<20} {:>10}    {}",
            check.display_name, status_display, check.message
        );
        if let Some(ref suggestion) = check.suggestion {
            println!("                              └─ {suggestion}");
        }
    }

    println!();
    println!("═══════════════════════════════════════════════════════");
    let overall = match report.overall_status {
        DiagnosticStatus::Pass => "All checks passed".to_string(),
        DiagnosticStatus::Fail => format!("{} check(s) failed", report.fail_count()),
        DiagnosticStatus::Warn => "Warnings detected".to_string(),
        DiagnosticStatus::Skip => "Checks skipped".to_string(),
    };
    println!("  Overall Status: {} {overall}", report.overall_status.symbol());
    println!("  Version: {}", report.version);
    println!("  Checked at: {}", report.timestamp);
    println!();
}

pub async fn execute(args: CheckArgs, config_path: Option<&Path>) -> AppResult<()> {
    let report = run_all_checks(config_path).await;

    if args.json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| AppError::Internal(format!("failed to serialize report: {e}")))?;
        println!("{json}");
    } else {
        print_report(&report);
    }

    match report.fail_count() {
        0 => Ok(()),
        failed => Err(AppError::ChecksFailed(failed)),
    }
}
