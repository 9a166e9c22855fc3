//! Application state management

use std::sync::Arc;

use tracing::info;

use crate::app::options::AppOptions;
use crate::authn::credentials::KeycloakExchanger;
use crate::deploy::dispatch::CommandDispatcher;
use crate::deploy::orchestrator::Orchestrator;
use crate::deploy::watcher::CompletionWatcher;
use crate::errors::DeployerError;
use crate::filesys::file::File;
use crate::http::client::HttpClient;

/// Main application state
pub struct AppState {
    /// Deployment orchestrator shared by all requests
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    /// Initialize application state
    pub fn init(options: &AppOptions) -> Result<Self, DeployerError> {
        info!("Initializing application state...");

        let http_client = Arc::new(HttpClient::new(
            &options.keycloak_base_url,
            options.keycloak_timeout,
        )?);
        let credentials = Arc::new(KeycloakExchanger::new(http_client));

        let dispatcher = CommandDispatcher::new(File::new(options.handoff_file.clone()));
        let watcher = CompletionWatcher::new(&options.watcher);

        let orchestrator = Arc::new(Orchestrator::new(
            credentials,
            dispatcher,
            watcher,
            options.watch_mode,
        ));

        info!(
            "Handing off to {} and watching {} ({:?})",
            options.handoff_file.display(),
            options.watcher.log_file.display(),
            options.watch_mode,
        );

        Ok(Self { orchestrator })
    }
}
