//! Error reporting to Sentry

use sentry::{ClientInitGuard, ClientOptions, IntoDsn};
use tracing::{error, info};

use crate::storage::settings::SentrySettings;

/// Release name reported with every event
pub fn release() -> String {
    format!("deployer-backend@{}", env!("CARGO_PKG_VERSION"))
}

/// Build the client options, `None` when reporting is disabled
pub fn client_options(settings: &SentrySettings) -> Option<ClientOptions> {
    let dsn = match settings.dsn.as_deref().unwrap_or_default().into_dsn() {
        Ok(Some(dsn)) => dsn,
        Ok(None) => return None,
        Err(e) => {
            error!("Error parsing Sentry DSN: {e}");
            return None;
        }
    };

    Some(ClientOptions {
        dsn: Some(dsn),
        environment: Some(settings.environment.clone().into()),
        release: Some(release().into()),
        ..Default::default()
    })
}

/// Initialize Sentry
///
/// Events are only sent while the returned guard is alive.
pub fn init_sentry(settings: &SentrySettings) -> Option<ClientInitGuard> {
    let Some(options) = client_options(settings) else {
        info!("Sentry DSN is not set, error reporting disabled");
        return None;
    };

    info!("Reporting errors to Sentry ({})", settings.environment);
    let guard = sentry::init(options);

    // Identifies the container the process runs in
    let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string());
    sentry::configure_scope(|scope| scope.set_tag("hostname", hostname));

    Some(guard)
}
