// src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::ai_adapter::AiError;
use crate::ai_command::CommandError;
use crate::sources::RegistryError;

/// Errors that reach the HTTP boundary. The `kind` field lets the UI tell a
/// storage problem apart from a bad request or an upstream model failure.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Storage(String),
    #[error("{0}")]
    Upstream(String),
    #[error("assistant is disabled")]
    AiDisabled,
}

impl ApiError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage"),
            ApiError::Upstream(_) => (StatusCode::BAD_GATEWAY, "upstream"),
            ApiError::AiDisabled => (StatusCode::SERVICE_UNAVAILABLE, "ai_disabled"),
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::NotFound(_) => ApiError::NotFound(e.to_string()),
            RegistryError::Invalid(_) => ApiError::BadRequest(e.to_string()),
            RegistryError::Unreadable { .. } | RegistryError::Unwritable { .. } => {
                ApiError::Storage(e.to_string())
            }
        }
    }
}

impl From<CommandError> for ApiError {
    fn from(e: CommandError) -> Self {
        match e {
            CommandError::Registry(r) => r.into(),
            CommandError::NoMatch => ApiError::NotFound(e.to_string()),
        }
    }
}

impl From<AiError> for ApiError {
    fn from(e: AiError) -> Self {
        match e {
            AiError::Disabled => ApiError::AiDisabled,
            AiError::Upstream(_) | AiError::Empty => ApiError::Upstream(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        if status.is_server_error() {
            tracing::error!(kind, error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string(), "kind": kind }))).into_response()
    }
}
