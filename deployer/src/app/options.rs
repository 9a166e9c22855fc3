//! Application configuration options

use std::path::PathBuf;
use std::time::Duration;

use crate::deploy::orchestrator::WatchMode;
use crate::deploy::watcher;
use crate::storage::settings::Settings;

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Keycloak base URL
    pub keycloak_base_url: String,

    /// Timeout for token requests
    pub keycloak_timeout: Duration,

    /// Hand-off file read by the setup script
    pub handoff_file: PathBuf,

    /// Completion log watcher options
    pub watcher: watcher::Options,

    /// How deployment outcomes are awaited
    pub watch_mode: WatchMode,

    /// Server configuration
    pub server: ServerOptions,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            lifecycle: LifecycleOptions::default(),
            keycloak_base_url: "http://localhost:8080".to_string(),
            keycloak_timeout: Duration::from_secs(30),
            handoff_file: PathBuf::from("dist/assets/arg-pipe"),
            watcher: watcher::Options::default(),
            watch_mode: WatchMode::default(),
            server: ServerOptions::default(),
        }
    }
}

impl From<&Settings> for AppOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            lifecycle: LifecycleOptions::default(),
            keycloak_base_url: settings.keycloak.url.clone(),
            keycloak_timeout: Duration::from_secs(settings.keycloak.request_timeout_secs),
            handoff_file: settings.provisioner.handoff_file.clone(),
            watcher: watcher::Options {
                log_file: settings.provisioner.completion_log.clone(),
                poll_interval: Duration::from_millis(settings.provisioner.poll_interval_ms),
            },
            watch_mode: settings.provisioner.watch_mode(),
            server: ServerOptions {
                host: settings.server.host.clone(),
                port: settings.server.port,
            },
        }
    }
}

/// Lifecycle options for the deployer
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}

/// HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}
