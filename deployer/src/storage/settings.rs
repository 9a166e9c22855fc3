//! Settings file management

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::deploy::orchestrator::WatchMode;
use crate::errors::DeployerError;
use crate::filesys::file::File;
use crate::logs::LogLevel;

/// Deployer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit logs as JSON
    #[serde(default)]
    pub log_json: bool,

    /// Directory for daily log files, stdout only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Identity provider configuration
    #[serde(default)]
    pub keycloak: KeycloakSettings,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerSettings,

    /// Setup script hand-off configuration
    #[serde(default)]
    pub provisioner: ProvisionerSettings,

    /// Error reporting configuration
    #[serde(default)]
    pub sentry: SentrySettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_json: false,
            log_dir: None,
            keycloak: KeycloakSettings::default(),
            server: ServerSettings::default(),
            provisioner: ProvisionerSettings::default(),
            sentry: SentrySettings::default(),
        }
    }
}

/// Identity provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeycloakSettings {
    /// Base URL of the Keycloak server
    #[serde(default)]
    pub url: String,

    /// Token request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for KeycloakSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// How to wait for the setup script
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchModeSetting {
    Skip,
    Unbounded,
    #[default]
    Bounded,
}

impl std::str::FromStr for WatchModeSetting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "skip" | "none" => Ok(WatchModeSetting::Skip),
            "unbounded" => Ok(WatchModeSetting::Unbounded),
            "bounded" => Ok(WatchModeSetting::Bounded),
            _ => Err(format!("Invalid watch mode: {}", s)),
        }
    }
}

/// Setup script hand-off settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionerSettings {
    /// File (or named pipe) the setup script reads commands from
    #[serde(default = "default_handoff_file")]
    pub handoff_file: PathBuf,

    /// Log the setup script appends its progress to
    #[serde(default = "default_completion_log")]
    pub completion_log: PathBuf,

    #[serde(default)]
    pub watch_mode: WatchModeSetting,

    /// Limit for the bounded watch mode
    #[serde(default = "default_watch_timeout")]
    pub watch_timeout_secs: u64,

    /// Completion log polling interval
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

fn default_handoff_file() -> PathBuf {
    PathBuf::from("dist/assets/arg-pipe")
}

fn default_completion_log() -> PathBuf {
    PathBuf::from("../ndb-setup/deployer/deploy-log.txt")
}

fn default_watch_timeout() -> u64 {
    600
}

fn default_poll_interval() -> u64 {
    250
}

impl Default for ProvisionerSettings {
    fn default() -> Self {
        Self {
            handoff_file: default_handoff_file(),
            completion_log: default_completion_log(),
            watch_mode: WatchModeSetting::default(),
            watch_timeout_secs: default_watch_timeout(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

/// Error reporting settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentrySettings {
    /// Project DSN, reporting is disabled when unset
    #[serde(default)]
    pub dsn: Option<String>,

    #[serde(default = "default_sentry_environment")]
    pub environment: String,
}

fn default_sentry_environment() -> String {
    "production".to_string()
}

impl Default for SentrySettings {
    fn default() -> Self {
        Self {
            dsn: None,
            environment: default_sentry_environment(),
        }
    }
}

impl ProvisionerSettings {
    pub fn watch_mode(&self) -> WatchMode {
        match self.watch_mode {
            WatchModeSetting::Skip => WatchMode::Skip,
            WatchModeSetting::Unbounded => WatchMode::Unbounded,
            WatchModeSetting::Bounded => {
                WatchMode::Bounded(Duration::from_secs(self.watch_timeout_secs))
            }
        }
    }
}

impl Settings {
    /// Load settings from a JSON file, falling back to defaults without one
    pub async fn load(path: Option<&str>) -> Result<Self, DeployerError> {
        match path {
            Some(path) => File::new(path).read_json::<Settings>().await,
            None => Ok(Settings::default()),
        }
    }

    /// Apply overrides from the process environment
    pub fn with_env(self) -> Result<Self, DeployerError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, keyed by environment variable name
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, DeployerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("KEYCLOAK_URL") {
            self.keycloak.url = url;
        }
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = parse_setting("PORT", &port)?;
        }
        if let Some(path) = lookup("ARG_PIPE_PATH") {
            self.provisioner.handoff_file = PathBuf::from(path);
        }
        if let Some(path) = lookup("DEPLOY_LOG_PATH") {
            self.provisioner.completion_log = PathBuf::from(path);
        }
        if let Some(mode) = lookup("WATCH_MODE") {
            self.provisioner.watch_mode = parse_setting("WATCH_MODE", &mode)?;
        }
        if let Some(secs) = lookup("WATCH_TIMEOUT_SECS") {
            self.provisioner.watch_timeout_secs = parse_setting("WATCH_TIMEOUT_SECS", &secs)?;
        }
        if let Some(ms) = lookup("WATCH_POLL_INTERVAL_MS") {
            self.provisioner.poll_interval_ms = parse_setting("WATCH_POLL_INTERVAL_MS", &ms)?;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.log_level = parse_setting("LOG_LEVEL", &level)?;
        }
        if let Some(json) = lookup("LOG_JSON") {
            self.log_json = parse_setting("LOG_JSON", &json)?;
        }
        if let Some(dir) = lookup("LOG_DIR") {
            self.log_dir = Some(PathBuf::from(dir));
        }
        if let Some(dsn) = lookup("SENTRY_DSN") {
            self.sentry.dsn = Some(dsn).filter(|dsn| !dsn.is_empty());
        }
        if let Some(environment) = lookup("SENTRY_ENVIRONMENT") {
            self.sentry.environment = environment;
        }
        Ok(self)
    }

    /// Check the settings are usable
    pub fn validate(&self) -> Result<(), DeployerError> {
        if self.keycloak.url.is_empty() {
            return Err(DeployerError::Config("KEYCLOAK_URL is not set".to_string()));
        }
        Url::parse(&self.keycloak.url).map_err(|e| {
            DeployerError::Config(format!("Invalid Keycloak URL '{}': {}", self.keycloak.url, e))
        })?;
        if self.provisioner.watch_mode == WatchModeSetting::Bounded
            && self.provisioner.watch_timeout_secs == 0
        {
            return Err(DeployerError::Config(
                "watch_timeout_secs must be positive".to_string(),
            ));
        }
        if self.provisioner.poll_interval_ms == 0 {
            return Err(DeployerError::Config(
                "poll_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_setting<T>(key: &str, value: &str) -> Result<T, DeployerError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| DeployerError::Config(format!("Invalid {} '{}': {}", key, value, e)))
}
