//! Error types for the deployer backend

use std::fmt;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// A rejected deployment parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Offending field, `None` when the rule applies to the request as a whole
    pub field: Option<&'static str>,

    /// Human-readable reason, safe to show the caller
    pub reason: String,
}

impl ValidationError {
    pub fn field(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field: Some(field),
            reason: reason.into(),
        }
    }

    pub fn aggregate(reason: impl Into<String>) -> Self {
        Self {
            field: None,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.field {
            Some(field) => write!(f, "{}: {}", field, self.reason),
            None => write!(f, "{}", self.reason),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Main error type for the deployer backend
#[derive(Error, Debug)]
pub enum DeployerError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    ProvisioningFailed(String),

    #[error("No completion reported within {0:?}")]
    WatchTimeout(Duration),

    #[error("Completion log closed before a terminal line")]
    WatchClosed,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DeployerError {
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::Validation(_) => "bad_request",
            Self::Io(_) => "io_error",
            Self::ProvisioningFailed(_) => "provisioning_failed",
            Self::WatchTimeout(_) => "watch_timeout",
            Self::WatchClosed => "watch_closed",
            Self::Http(_) => "http_error",
            Self::Json(_) => "json_error",
            Self::Config(_) => "config_error",
            Self::Server(_) => "server_error",
            Self::Internal(_) => "internal_error",
        }
    }

    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Io(_)
            | Self::ProvisioningFailed(_)
            | Self::WatchTimeout(_)
            | Self::WatchClosed
            | Self::Http(_)
            | Self::Json(_)
            | Self::Config(_)
            | Self::Server(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message returned to the caller
    pub fn public_message(&self) -> String {
        match self {
            // Caller-fixable, or reported by the trusted provisioning script
            Self::Unauthorized => "Unauthorized".to_owned(),
            Self::Validation(err) => err.reason.clone(),
            Self::ProvisioningFailed(message) => message.clone(),

            // Hide internal paths and configuration
            Self::Io(_)
            | Self::WatchTimeout(_)
            | Self::WatchClosed
            | Self::Http(_)
            | Self::Json(_)
            | Self::Config(_)
            | Self::Server(_)
            | Self::Internal(_) => "Internal server error".to_owned(),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
}

impl IntoResponse for DeployerError {
    fn into_response(self) -> Response {
        let field = match &self {
            Self::Validation(err) => err.field,
            _ => None,
        };
        let body = ErrorBody {
            error: self.error_type(),
            message: self.public_message(),
            field,
        };

        (self.status_code(), Json(body)).into_response()
    }
}
