use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Shown for every failed login, whatever the cause.
pub const AUTH_FAILURE_MESSAGE: &str = "Invalid email or password";

/// Client-facing text for store failures; the detail only goes to the log.
pub const STORE_UNAVAILABLE_MESSAGE: &str = "Account store unavailable, please retry";

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                RepoError::Unavailable(e.to_string())
            }
            other => RepoError::Database(other),
        }
    }
}

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("{0}")]
    Validation(String),

    #[error("account {0} not found")]
    NotFound(i64),

    #[error("persistence error: {0}")]
    Persistence(#[from] RepoError),

    #[error("{}", AUTH_FAILURE_MESSAGE)]
    AuthenticationFailure,
}

impl AccountError {
    pub fn validation<T: Into<String>>(msg: T) -> Self {
        Self::Validation(msg.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AccountError::Validation(_) => "validation_error",
            AccountError::NotFound(_) => "not_found",
            AccountError::Persistence(_) => "persistence_error",
            AccountError::AuthenticationFailure => "authentication_failure",
        }
    }

    /// Only store failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AccountError::Persistence(_))
    }

    /// Message safe to hand to HTTP clients.
    pub fn public_message(&self) -> String {
        match self {
            AccountError::Persistence(_) => STORE_UNAVAILABLE_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AccountError::Validation(_) => StatusCode::BAD_REQUEST,
            AccountError::NotFound(_) => StatusCode::NOT_FOUND,
            AccountError::Persistence(_) => StatusCode::SERVICE_UNAVAILABLE,
            AccountError::AuthenticationFailure => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, kind = self.kind(), "account operation failed");
        }
        let body = Json(json!({
            "error": self.kind(),
            "message": self.public_message(),
        }));
        (status, body).into_response()
    }
}
