//! RPC error types and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use fundrelay_chain::ChainError;
use fundrelay_registry::RegistryError;
use fundrelay_types::{ErrorKind, ParseError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("the faucet is disabled on this node")]
    FaucetDisabled,

    #[error("server error: {0}")]
    Server(String),
}

impl From<RegistryError> for RpcError {
    fn from(e: RegistryError) -> Self {
        Self::Chain(ChainError::Registry(e))
    }
}

impl RpcError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Chain(e) => e.kind(),
            Self::Parse(e) => e.kind(),
            Self::InvalidRequest(_) => ErrorKind::Validation,
            Self::FaucetDisabled => ErrorKind::NotFound,
            Self::Server(_) => ErrorKind::Fatal,
        }
    }
}

/// Status code clients use to tell "fix the input" from "retry later".
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Authorization => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Transient => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Fatal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// JSON error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: ErrorKind,
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = status_for(kind);
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, %kind, "request rejected");
        }
        let body = ErrorBody {
            error: self.to_string(),
            kind,
        };
        (status, Json(body)).into_response()
    }
}
