//! Finite State Machine for a single deployment request

use serde::{Deserialize, Serialize};

/// Deployment state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentState {
    /// Request accepted, nothing done yet
    Received,

    /// Exchanging the client credentials
    Authenticating,

    /// Checking the request parameters
    Validating,

    /// Writing the command to the hand-off file
    Dispatching,

    /// Waiting for the completion log
    Watching,

    /// Resolved successfully
    Succeeded,

    /// Resolved with an error
    Failed,
}

impl DeploymentState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeploymentState::Succeeded | DeploymentState::Failed)
    }
}

/// Deployment event
#[derive(Debug, Clone)]
pub enum DeploymentEvent {
    /// Start processing
    Begin,

    /// Credentials were accepted
    Authorized,

    /// Parameters are valid
    Validated,

    /// Command handed off, waiting for the outcome
    Watch,

    /// Deployment finished (or was handed off without watching)
    Complete,

    /// Any step failed
    Fail(String),
}

/// Deployment FSM
#[derive(Debug, Clone)]
pub struct DeploymentFsm {
    state: DeploymentState,
    error: Option<String>,
}

impl DeploymentFsm {
    /// Create a new FSM in received state
    pub fn new() -> Self {
        Self {
            state: DeploymentState::Received,
            error: None,
        }
    }

    /// Get current state
    pub fn state(&self) -> &DeploymentState {
        &self.state
    }

    /// Get error message if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: DeploymentEvent) -> Result<(), String> {
        let new_state = match (&self.state, &event) {
            (DeploymentState::Received, DeploymentEvent::Begin) => DeploymentState::Authenticating,
            (DeploymentState::Authenticating, DeploymentEvent::Authorized) => {
                DeploymentState::Validating
            }
            (DeploymentState::Validating, DeploymentEvent::Validated) => {
                DeploymentState::Dispatching
            }

            // Watching is optional
            (DeploymentState::Dispatching, DeploymentEvent::Watch) => DeploymentState::Watching,
            (DeploymentState::Dispatching, DeploymentEvent::Complete)
            | (DeploymentState::Watching, DeploymentEvent::Complete) => DeploymentState::Succeeded,

            (
                DeploymentState::Authenticating
                | DeploymentState::Validating
                | DeploymentState::Dispatching
                | DeploymentState::Watching,
                DeploymentEvent::Fail(err),
            ) => {
                self.error = Some(err.clone());
                DeploymentState::Failed
            }

            // Invalid transitions
            (state, event) => {
                return Err(format!("Invalid transition: {:?} -> {:?}", state, event));
            }
        };

        self.state = new_state;
        Ok(())
    }
}

impl Default for DeploymentFsm {
    fn default() -> Self {
        Self::new()
    }
}
