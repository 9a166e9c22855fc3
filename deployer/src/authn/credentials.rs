//! Client-credentials check against the identity provider

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

use crate::errors::DeployerError;
use crate::http::client::HttpClient;

/// Token endpoint of the master realm
pub const TOKEN_PATH: &str = "/realms/master/protocol/openid-connect/token";

/// Credential exchanger trait for testability
#[async_trait]
pub trait CredentialExchanger: Send + Sync {
    /// Succeeds when the identity provider issues a token for the client
    async fn authorize(
        &self,
        client_id: &str,
        client_secret: &SecretString,
    ) -> Result<(), DeployerError>;
}

/// Keycloak client-credentials exchanger
///
/// Only successful issuance matters, the token itself is discarded. Every
/// failure surfaces as [`DeployerError::Unauthorized`].
pub struct KeycloakExchanger {
    http_client: Arc<HttpClient>,
}

impl KeycloakExchanger {
    pub fn new(http_client: Arc<HttpClient>) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl CredentialExchanger for KeycloakExchanger {
    async fn authorize(
        &self,
        client_id: &str,
        client_secret: &SecretString,
    ) -> Result<(), DeployerError> {
        debug!("Requesting client-credentials token for '{}'", client_id);

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", client_id),
            ("client_secret", client_secret.expose_secret()),
        ];

        match self.http_client.post_form(TOKEN_PATH, &form).await {
            Ok(status) if status.is_success() => {
                info!("Client '{}' authorized", client_id);
                Ok(())
            }
            Ok(StatusCode::UNAUTHORIZED) => {
                info!("Client '{}' rejected by identity provider", client_id);
                Err(DeployerError::Unauthorized)
            }
            // Other failures are reported to the caller as unauthorized too
            Ok(status) => {
                warn!("Token request for '{}' returned {}", client_id, status);
                Err(DeployerError::Unauthorized)
            }
            Err(e) => {
                warn!("Token request for '{}' failed: {}", client_id, e);
                Err(DeployerError::Unauthorized)
            }
        }
    }
}
