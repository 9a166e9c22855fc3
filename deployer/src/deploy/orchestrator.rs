//! Deployment request orchestration
//!
//! A request is authenticated, validated, handed off to the setup script and,
//! depending on the [`WatchMode`], observed until the completion log reports
//! an outcome. The hand-off file and completion log are shared by all
//! requests, so deployments are processed one at a time.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, error, info, info_span, Instrument};

use crate::authn::credentials::CredentialExchanger;
use crate::deploy::dispatch::CommandDispatcher;
use crate::deploy::fsm::{DeploymentEvent, DeploymentFsm};
use crate::deploy::validate::validate;
use crate::deploy::watcher::{CompletionSignal, CompletionWatcher};
use crate::errors::DeployerError;
use crate::models::deployment::{DeploymentAck, DeploymentRequest};
use crate::utils::generate_uuid;

/// How the outcome of a handed-off deployment is determined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchMode {
    /// Resolve as soon as the command is handed off
    Skip,

    /// Wait for the completion log without a limit
    Unbounded,

    /// Wait for the completion log at most this long
    Bounded(Duration),
}

impl Default for WatchMode {
    fn default() -> Self {
        WatchMode::Bounded(Duration::from_secs(600))
    }
}

/// Sequences credential exchange, validation, hand-off and watching
pub struct Orchestrator {
    credentials: Arc<dyn CredentialExchanger>,
    dispatcher: CommandDispatcher,
    watcher: CompletionWatcher,
    watch_mode: WatchMode,
    slot: Mutex<()>,
}

impl Orchestrator {
    pub fn new(
        credentials: Arc<dyn CredentialExchanger>,
        dispatcher: CommandDispatcher,
        watcher: CompletionWatcher,
        watch_mode: WatchMode,
    ) -> Self {
        Self {
            credentials,
            dispatcher,
            watcher,
            watch_mode,
            slot: Mutex::new(()),
        }
    }

    /// Run a deployment request to completion
    pub async fn deploy(
        &self,
        request: DeploymentRequest,
    ) -> Result<DeploymentAck, DeployerError> {
        let correlation_id = generate_uuid();
        let span = info_span!(
            "deployment",
            correlation_id = %correlation_id,
            instance = %request.instance_name,
        );

        async move {
            let _slot = self.slot.lock().await;
            let mut fsm = DeploymentFsm::new();

            match self.run(&mut fsm, request).await {
                Ok(watched) => {
                    info!("Deployment succeeded");
                    Ok(DeploymentAck {
                        ok: true,
                        watched,
                        correlation_id,
                    })
                }
                Err(e) => {
                    if !fsm.state().is_terminal() {
                        advance(&mut fsm, DeploymentEvent::Fail(e.to_string()))?;
                    }
                    error!("Deployment failed: {}", e);
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Returns whether the outcome was observed in the completion log
    async fn run(
        &self,
        fsm: &mut DeploymentFsm,
        request: DeploymentRequest,
    ) -> Result<bool, DeployerError> {
        advance(fsm, DeploymentEvent::Begin)?;
        self.credentials
            .authorize(&request.client_id, &request.client_secret)
            .await?;

        advance(fsm, DeploymentEvent::Authorized)?;
        let request = validate(request)?;

        advance(fsm, DeploymentEvent::Validated)?;
        match self.watch_mode {
            WatchMode::Bounded(limit) => {
                tokio::time::timeout(limit, self.hand_off(fsm, &request))
                    .await
                    .map_err(|_| DeployerError::WatchTimeout(limit))?
            }
            _ => self.hand_off(fsm, &request).await,
        }
    }

    /// Dispatch the command and, unless skipped, wait for its outcome
    async fn hand_off(
        &self,
        fsm: &mut DeploymentFsm,
        request: &DeploymentRequest,
    ) -> Result<bool, DeployerError> {
        // Attach before the hand-off so a fast script cannot finish unobserved
        let watch = match self.watch_mode {
            WatchMode::Skip => None,
            WatchMode::Unbounded | WatchMode::Bounded(_) => Some(self.watcher.attach().await?),
        };
        self.dispatcher.dispatch(request).await?;

        let Some(watch) = watch else {
            advance(fsm, DeploymentEvent::Complete)?;
            return Ok(false);
        };

        advance(fsm, DeploymentEvent::Watch)?;
        match watch.outcome().await? {
            CompletionSignal::Done => {
                advance(fsm, DeploymentEvent::Complete)?;
                Ok(true)
            }
            CompletionSignal::Failed(message) => Err(DeployerError::ProvisioningFailed(message)),
        }
    }
}

fn advance(fsm: &mut DeploymentFsm, event: DeploymentEvent) -> Result<(), DeployerError> {
    fsm.process(event).map_err(DeployerError::Internal)?;
    debug!("Deployment state: {:?}", fsm.state());
    Ok(())
}
