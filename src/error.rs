use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Errors produced by the agent and its collaborators.
///
/// Model-output problems (no JSON, wrong schema) are absent:
/// the [`StructuredPipeline`](crate::pipeline::StructuredPipeline) degrades
/// those into a usable result instead of returning an error.
#[derive(Error, Debug)]
pub enum AgentError {
    /// The language-model call failed at the transport or HTTP layer.
    #[error("{0}")]
    BackendUnavailable(String),

    /// The destination store rejected the access credential (HTTP 401).
    #[error("Unauthorized (401) when {operation}. Ensure API permissions and consent are granted. Response: {body}")]
    Unauthorized {
        /// What the store was doing, e.g. `"listing notebooks"`.
        operation: &'static str,
        /// Response body, kept for diagnosing consent problems.
        body: String,
    },

    /// The destination store answered with a non-success status.
    #[error("Remote API returned HTTP {status}: {body}")]
    RemoteError {
        /// HTTP status code.
        status: u16,
        /// Response body text.
        body: String,
    },

    /// A notebook or section named by the caller does not exist.
    #[error("{0}")]
    DestinationNotFound(String),

    /// Acquiring an access token failed.
    #[error("Auth failed: {0}")]
    Auth(String),

    /// OCR or speech-to-text failed.
    #[error("Media processing failed: {0}")]
    Media(String),

    /// The request carried nothing usable.
    #[error("{0}")]
    InvalidInput(String),

    /// Invalid configuration detected at startup.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Low-level HTTP transport failure (connection refused, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// JSON parsing failed at the serde level.
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem or process I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Catch-all for other errors.
    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        AgentError::Other(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;

impl AgentError {
    /// HTTP status and a stable code for this error.
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            Self::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            Self::Unauthorized { .. } => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::DestinationNotFound(_) => (StatusCode::NOT_FOUND, "DESTINATION_NOT_FOUND"),
            Self::BackendUnavailable(_) => (StatusCode::BAD_GATEWAY, "BACKEND_UNAVAILABLE"),
            Self::RemoteError { .. } | Self::Request(_) => (StatusCode::BAD_GATEWAY, "REMOTE_ERROR"),
            Self::Auth(_) => (StatusCode::BAD_GATEWAY, "AUTH_FAILED"),
            Self::Media(_) => (StatusCode::INTERNAL_SERVER_ERROR, "MEDIA_ERROR"),
            Self::InvalidConfig(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIGURATION_ERROR"),
            Self::Json(_) | Self::Io(_) | Self::Other(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        }
    }
}

/// Error body returned by the HTTP handlers.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for AgentError {
    fn into_response(self) -> Response {
        let (status, code) = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, code, "request failed");
        } else {
            tracing::warn!(error = %self, code, "request rejected");
        }
        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
