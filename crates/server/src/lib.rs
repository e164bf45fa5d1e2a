//! Hermes Server
//!
//! HTTP boundary of the sales assistant: the chat endpoint, health and
//! readiness checks, and Prometheus metrics.

pub mod chat;
pub mod http;
pub mod metrics;
pub mod state;

pub use chat::{ChatReply, ChatService, ChatTurn};
pub use http::create_router;
pub use metrics::{init_metrics, metrics_handler};
pub use state::AppState;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Message returned for a missing or blank chat message
pub const MISSING_MESSAGE: &str = "Mensaje requerido";

/// Message returned for every other failure
pub const INTERNAL_ERROR: &str = "Error interno del servidor";

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl ServerError {
    /// Text shown to the caller; internal details never leave the server
    fn public_message(&self) -> &str {
        match self {
            ServerError::InvalidRequest(message) => message,
            ServerError::Internal(_) | ServerError::Persistence(_) => INTERNAL_ERROR,
        }
    }
}

impl From<&ServerError> for StatusCode {
    fn from(err: &ServerError) -> Self {
        match err {
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = StatusCode::from(&self);
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        let body = Json(serde_json::json!({ "error": self.public_message() }));
        (status, body).into_response()
    }
}

impl From<hermes_core::Error> for ServerError {
    fn from(err: hermes_core::Error) -> Self {
        match err {
            hermes_core::Error::Validation(_) => {
                ServerError::InvalidRequest(MISSING_MESSAGE.to_string())
            }
            hermes_core::Error::Persistence(message) => ServerError::Persistence(message),
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl From<hermes_agent::AgentError> for ServerError {
    fn from(err: hermes_agent::AgentError) -> Self {
        hermes_core::Error::from(err).into()
    }
}
