//! Service configuration loading and validation.
//!
//! The YAML file is expanded against the process environment before it is
//! parsed, so secrets can be written as `${SCIMSYNC_API_TOKEN}`. A handful
//! of `SCIMSYNC_*` variables override parsed values afterwards.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use scimsync_reconcile::{EnrollmentGroup, RetryPolicy, SyncOptions};
use scimsync_scim_client::auth::ApiToken;
use scimsync_scim_client::ScimSettings;
use scimsync_workspace::WorkspaceSettings;

use crate::error::{AppError, AppResult};

/// Locations searched, in order, when no path is given.
pub const SEARCH_PATHS: &[&str] = &[
    "./config.yaml",
    "./config.yml",
    "~/.config/scim-sync/config.yaml",
    "~/.config/scim-sync/config.yml",
];

const LOG_LEVELS: &[&str] = &["debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["text", "json"];
const MIN_SCHEDULE_INTERVAL_SECS: u64 = 60;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub google_workspace: GoogleWorkspaceConfig,
    #[serde(default)]
    pub beyond_identity: BeyondIdentityConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Process-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default)]
    pub test_mode: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            test_mode: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

/// Upstream directory settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleWorkspaceConfig {
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub super_admin_email: String,
    #[serde(default)]
    pub service_account_key_path: String,
    #[serde(default = "default_workspace_api_url")]
    pub api_base_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
}

impl Default for GoogleWorkspaceConfig {
    fn default() -> Self {
        Self {
            domain: String::new(),
            super_admin_email: String::new(),
            service_account_key_path: String::new(),
            api_base_url: default_workspace_api_url(),
            token_url: default_token_url(),
        }
    }
}

fn default_workspace_api_url() -> String {
    scimsync_workspace::client::DEFAULT_BASE_URL.to_string()
}

fn default_token_url() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// Downstream directory settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct BeyondIdentityConfig {
    #[serde(default)]
    pub api_token: String,
    #[serde(default = "default_scim_base_url")]
    pub scim_base_url: String,
    #[serde(default = "default_native_api_url")]
    pub native_api_url: String,
    #[serde(default = "default_group_prefix")]
    pub group_prefix: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_native_page_size")]
    pub native_page_size: u32,
}

impl std::fmt::Debug for BeyondIdentityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeyondIdentityConfig")
            .field("api_token", &"[REDACTED]")
            .field("scim_base_url", &self.scim_base_url)
            .field("native_api_url", &self.native_api_url)
            .field("group_prefix", &self.group_prefix)
            .field("timeout_secs", &self.timeout_secs)
            .field("native_page_size", &self.native_page_size)
            .finish()
    }
}

impl Default for BeyondIdentityConfig {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            scim_base_url: default_scim_base_url(),
            native_api_url: default_native_api_url(),
            group_prefix: default_group_prefix(),
            timeout_secs: default_timeout_secs(),
            native_page_size: default_native_page_size(),
        }
    }
}

fn default_scim_base_url() -> String {
    "https://api.byndid.com/scim/v2".to_string()
}

fn default_native_api_url() -> String {
    "https://api.byndid.com/v2".to_string()
}

fn default_group_prefix() -> String {
    "GoogleSCIM_".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_native_page_size() -> u32 {
    50
}

/// What to sweep and how.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_delay_seconds")]
    pub retry_delay_seconds: u64,
    /// Defaults to `byid-enrolled@<domain>`.
    #[serde(default)]
    pub enrollment_group_email: Option<String>,
    #[serde(default)]
    pub enrollment_group_name: Option<String>,
    #[serde(default)]
    pub enrollment_group_description: Option<String>,
    #[serde(default = "default_true")]
    pub prune_enrollment_group: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            groups: Vec::new(),
            retry_attempts: default_retry_attempts(),
            retry_delay_seconds: default_retry_delay_seconds(),
            enrollment_group_email: None,
            enrollment_group_name: None,
            enrollment_group_description: None,
            prune_enrollment_group: true,
        }
    }
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_seconds() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

/// HTTP server and scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub schedule_enabled: bool,
    #[serde(default = "default_schedule_interval_secs")]
    pub schedule_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            schedule_enabled: false,
            schedule_interval_secs: default_schedule_interval_secs(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_schedule_interval_secs() -> u64 {
    6 * 60 * 60
}

/// One configuration problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl Config {
    /// Load from a file: expand, parse, then apply environment overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;

        let mut config = Self::from_yaml(&expand_env(&content))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from `path`, or from the first existing search location.
    pub fn discover(path: Option<&Path>) -> AppResult<(Self, PathBuf)> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => find_config_file()?,
        };
        let config = Self::load(&path)?;
        Ok((config, path))
    }

    /// Parse configuration from a YAML string (no expansion, no overrides).
    pub fn from_yaml(content: &str) -> AppResult<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Apply `SCIMSYNC_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("SCIMSYNC_API_TOKEN") {
            if !token.is_empty() {
                self.beyond_identity.api_token = token;
            }
        }
        if let Ok(level) = std::env::var("SCIMSYNC_LOG_LEVEL") {
            if !level.is_empty() {
                self.app.log_level = level.to_lowercase();
            }
        }
        if let Ok(test_mode) = std::env::var("SCIMSYNC_TEST_MODE") {
            if let Some(test_mode) = parse_bool(&test_mode) {
                self.app.test_mode = test_mode;
            }
        }
        if let Ok(port) = std::env::var("SCIMSYNC_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
    }

    /// Every problem with the configuration, empty when it is usable.
    #[must_use]
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if !LOG_LEVELS.contains(&self.app.log_level.as_str()) {
            issues.push(ValidationIssue::new(
                "app.log_level",
                format!("must be one of: {}", LOG_LEVELS.join(", ")),
            ));
        }
        if !LOG_FORMATS.contains(&self.app.log_format.as_str()) {
            issues.push(ValidationIssue::new(
                "app.log_format",
                format!("must be one of: {}", LOG_FORMATS.join(", ")),
            ));
        }

        // ── Google Workspace ──────────────────────────────────────────
        let gws = &self.google_workspace;
        if gws.domain.trim().is_empty() {
            issues.push(ValidationIssue::new("google_workspace.domain", "domain is required"));
        }
        if gws.super_admin_email.trim().is_empty() {
            issues.push(ValidationIssue::new(
                "google_workspace.super_admin_email",
                "super admin email is required",
            ));
        } else if !gws.super_admin_email.contains('@') {
            issues.push(ValidationIssue::new(
                "google_workspace.super_admin_email",
                format!("invalid email format: {}", gws.super_admin_email),
            ));
        }
        if gws.service_account_key_path.trim().is_empty() {
            issues.push(ValidationIssue::new(
                "google_workspace.service_account_key_path",
                "service account key path is required",
            ));
        } else if !Path::new(&gws.service_account_key_path).is_file() {
            issues.push(ValidationIssue::new(
                "google_workspace.service_account_key_path",
                format!(
                    "service account key file not found: {}",
                    gws.service_account_key_path
                ),
            ));
        }
        check_http_url(&mut issues, "google_workspace.api_base_url", &gws.api_base_url);
        check_http_url(&mut issues, "google_workspace.token_url", &gws.token_url);

        // ── Beyond Identity ───────────────────────────────────────────
        let bi = &self.beyond_identity;
        if bi.api_token.trim().is_empty() {
            issues.push(ValidationIssue::new(
                "beyond_identity.api_token",
                "API token is required",
            ));
        }
        check_http_url(&mut issues, "beyond_identity.scim_base_url", &bi.scim_base_url);
        check_http_url(&mut issues, "beyond_identity.native_api_url", &bi.native_api_url);
        if bi.timeout_secs == 0 {
            issues.push(ValidationIssue::new(
                "beyond_identity.timeout_secs",
                "timeout must be at least 1 second",
            ));
        }

        // ── Sync ──────────────────────────────────────────────────────
        if self.sync.groups.is_empty() {
            issues.push(ValidationIssue::new(
                "sync.groups",
                "at least one group must be specified",
            ));
        }
        for (i, group) in self.sync.groups.iter().enumerate() {
            if !group.contains('@') {
                issues.push(ValidationIssue::new(
                    format!("sync.groups[{i}]"),
                    format!("invalid email format: {group}"),
                ));
            }
        }
        if self.sync.retry_attempts == 0 {
            issues.push(ValidationIssue::new(
                "sync.retry_attempts",
                "retry attempts must be at least 1",
            ));
        }
        if let Some(email) = &self.sync.enrollment_group_email {
            if !email.contains('@') {
                issues.push(ValidationIssue::new(
                    "sync.enrollment_group_email",
                    format!("invalid email format: {email}"),
                ));
            }
        }

        // ── Server ────────────────────────────────────────────────────
        if self.server.port == 0 {
            issues.push(ValidationIssue::new(
                "server.port",
                "port must be between 1 and 65535",
            ));
        }
        if self.server.schedule_enabled
            && self.server.schedule_interval_secs < MIN_SCHEDULE_INTERVAL_SECS
        {
            issues.push(ValidationIssue::new(
                "server.schedule_interval_secs",
                format!(
                    "interval must be at least {MIN_SCHEDULE_INTERVAL_SECS} seconds when schedule_enabled is true"
                ),
            ));
        }

        issues
    }

    /// Validate, turning any problems into an error.
    pub fn ensure_valid(&self) -> AppResult<()> {
        let issues = self.validate();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(issues))
        }
    }

    /// The enrollment group, filling gaps from the domain defaults.
    #[must_use]
    pub fn enrollment_group(&self) -> EnrollmentGroup {
        let defaults = EnrollmentGroup::for_domain(&self.google_workspace.domain);
        EnrollmentGroup {
            address: self
                .sync
                .enrollment_group_email
                .clone()
                .unwrap_or(defaults.address),
            display_name: self
                .sync
                .enrollment_group_name
                .clone()
                .unwrap_or(defaults.display_name),
            description: self
                .sync
                .enrollment_group_description
                .clone()
                .unwrap_or(defaults.description),
        }
    }

    /// Coordinator options derived from this configuration.
    #[must_use]
    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            group_prefix: self.beyond_identity.group_prefix.clone(),
            test_mode: self.app.test_mode,
            retry: RetryPolicy::new(
                self.sync.retry_attempts,
                Duration::from_secs(self.sync.retry_delay_seconds),
            ),
            enrollment_group: self.enrollment_group(),
            prune_enrollment_group: self.sync.prune_enrollment_group,
        }
    }

    #[must_use]
    pub fn workspace_settings(&self) -> WorkspaceSettings {
        let gws = &self.google_workspace;
        let mut settings =
            WorkspaceSettings::new(&gws.service_account_key_path, &gws.super_admin_email);
        settings.base_url.clone_from(&gws.api_base_url);
        settings.token_url = Some(gws.token_url.clone());
        settings
    }

    #[must_use]
    pub fn scim_settings(&self) -> ScimSettings {
        let bi = &self.beyond_identity;
        let mut settings = ScimSettings::new(
            &bi.scim_base_url,
            &bi.native_api_url,
            ApiToken::new(bi.api_token.clone()),
        );
        settings.timeout = Duration::from_secs(bi.timeout_secs);
        settings.native_page_size = bi.native_page_size;
        settings
    }

    /// Scheduler interval, when scheduling is enabled.
    #[must_use]
    pub fn schedule_interval(&self) -> Option<Duration> {
        self.server
            .schedule_enabled
            .then(|| Duration::from_secs(self.server.schedule_interval_secs))
    }
}

/// First existing file among [`SEARCH_PATHS`].
pub fn find_config_file() -> AppResult<PathBuf> {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    SEARCH_PATHS
        .iter()
        .filter_map(|location| match location.strip_prefix("~/") {
            Some(rest) => home.as_ref().map(|home| home.join(rest)),
            None => Some(PathBuf::from(location)),
        })
        .find(|path| path.is_file())
        .ok_or_else(|| {
            AppError::Config(format!(
                "No configuration file found in any of: {}",
                SEARCH_PATHS.join(", ")
            ))
        })
}

/// Replace `${VAR}` and `$VAR` with environment values. Unset variables
/// expand to the empty string.
#[must_use]
pub fn expand_env(content: &str) -> String {
    static ENV_REF: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
            .expect("ENV_REF is a valid regex pattern")
    });

    ENV_REF
        .replace_all(content, |caps: &regex::Captures<'_>| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map_or("", |m| m.as_str());
            std::env::var(name).unwrap_or_default()
        })
        .into_owned()
}

fn check_http_url(issues: &mut Vec<ValidationIssue>, field: &str, value: &str) {
    if !(value.starts_with("https://") || value.starts_with("http://")) {
        issues.push(ValidationIssue::new(
            field,
            format!("must be an http(s) URL: {value}"),
        ));
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
