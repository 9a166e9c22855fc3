//! Deployment models

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};

/// Locale used when the request leaves it blank
pub const DEFAULT_LOCALE: &str = "en";

/// A request to provision a new tenant instance
///
/// Field names on the wire follow the form integrations (`name`, `base`,
/// `clientKey`, ...); the descriptive names are accepted as aliases.
#[derive(Debug, Deserialize)]
pub struct DeploymentRequest {
    /// Name of the instance to create, used as subdomain and namespace
    #[serde(rename = "name", alias = "instanceName")]
    pub instance_name: String,

    /// Login of the initial site administrator
    #[serde(rename = "username", alias = "userName")]
    pub user_name: String,

    /// Email of the initial site administrator
    #[serde(rename = "email", alias = "userEmail")]
    pub user_email: String,

    /// Template configuration to clone
    #[serde(rename = "base", alias = "baseConfig")]
    pub base_config: String,

    /// Language of the instance (and its identity realm)
    #[serde(default)]
    pub locale: Option<String>,

    /// Set up the permission (replication) backend
    #[serde(default, rename = "backend", alias = "withReplicationBackend")]
    pub with_replication_backend: bool,

    /// Set up the query backend
    #[serde(default, rename = "queryBackend", alias = "withBackend")]
    pub with_backend: bool,

    /// Add the instance to uptime monitoring
    #[serde(default, rename = "monitor", alias = "withMonitoring")]
    pub with_monitoring: bool,

    /// Enable error reporting for the instance
    #[serde(default, rename = "sentry", alias = "withSentry")]
    pub with_sentry: bool,

    /// Client presented to the identity provider for this deployment
    #[serde(rename = "client", alias = "clientId")]
    pub client_id: String,

    /// Secret of `client_id`
    #[serde(
        rename = "clientKey",
        alias = "clientSecret",
        deserialize_with = "deserialize_secret"
    )]
    pub client_secret: SecretString,
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

impl DeploymentRequest {
    /// Locale with the default applied
    pub fn effective_locale(&self) -> &str {
        match self.locale.as_deref() {
            Some(locale) if !locale.is_empty() => locale,
            _ => DEFAULT_LOCALE,
        }
    }

    /// Free-text values of the request, including the client secret
    ///
    /// Flags are left out as their string form never holds whitespace.
    pub fn text_values(&self) -> [&str; 7] {
        [
            self.instance_name.as_str(),
            self.user_name.as_str(),
            self.user_email.as_str(),
            self.base_config.as_str(),
            self.locale.as_deref().unwrap_or_default(),
            self.client_id.as_str(),
            self.client_secret.expose_secret(),
        ]
    }
}

/// Acknowledgement returned for an accepted deployment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentAck {
    pub ok: bool,

    /// Whether the outcome was confirmed by the completion log
    pub watched: bool,

    pub correlation_id: String,
}
