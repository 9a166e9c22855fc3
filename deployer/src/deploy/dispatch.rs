//! Hand-off of validated deployments to the external setup script

use tracing::{debug, info};

use crate::errors::DeployerError;
use crate::filesys::file::File;
use crate::models::deployment::DeploymentRequest;

/// Writes deployment commands to the hand-off file watched by the setup script
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    handoff: File,
}

impl CommandDispatcher {
    pub fn new(handoff: File) -> Self {
        Self { handoff }
    }

    /// Replace the hand-off file contents with the command for `request`
    pub async fn dispatch(&self, request: &DeploymentRequest) -> Result<(), DeployerError> {
        let line = command_line(request);
        debug!("Writing command to {}", self.handoff.path().display());

        self.handoff.overwrite(&line).await?;

        info!("Deployment of '{}' handed off", request.instance_name);
        Ok(())
    }
}

/// Serialize a request into the positional command line
///
/// Token order: instance, base config, locale, email, username, then `y`/`n`
/// for replication backend, backend, monitoring and sentry.
pub fn command_line(request: &DeploymentRequest) -> String {
    let tokens = [
        request.instance_name.as_str(),
        request.base_config.as_str(),
        request.effective_locale(),
        request.user_email.as_str(),
        request.user_name.as_str(),
        flag(request.with_replication_backend),
        flag(request.with_backend),
        flag(request.with_monitoring),
        flag(request.with_sentry),
    ];

    let mut line = tokens.join(" ");
    line.push('\n');
    line
}

fn flag(enabled: bool) -> &'static str {
    if enabled {
        "y"
    } else {
        "n"
    }
}
