use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use axie_ledger::LedgerError;

/// Everything a request can fail with, mapped onto an HTTP status
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized | ApiError::Ledger(LedgerError::Unauthorized) => StatusCode::UNAUTHORIZED,
            ApiError::Ledger(LedgerError::MalformedRequest(_))
            | ApiError::Ledger(LedgerError::InvalidAmount(_))
            | ApiError::Ledger(LedgerError::InsufficientFunds { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Ledger(LedgerError::AccountExists(_)) => StatusCode::CONFLICT,
            ApiError::Ledger(LedgerError::Storage(_)) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Body shown to the client; server-side failures stay opaque
    pub fn public_message(&self) -> &'static str {
        match self {
            ApiError::Unauthorized | ApiError::Ledger(LedgerError::Unauthorized) => "unauthorized",
            ApiError::Ledger(LedgerError::MalformedRequest(_)) => "malformed request",
            ApiError::Ledger(LedgerError::InvalidAmount(_)) => "invalid amount",
            ApiError::Ledger(LedgerError::InsufficientFunds { .. }) => "insufficient balance",
            ApiError::Ledger(LedgerError::AccountExists(_)) => "account already exists",
            ApiError::Ledger(LedgerError::Storage(_)) | ApiError::Internal(_) => "",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        (status, self.public_message()).into_response()
    }
}
