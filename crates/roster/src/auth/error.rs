//! Authentication errors.

use thiserror::Error;

/// Errors raised while authenticating a request.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authorization header")]
    MissingAuthHeader,

    #[error("Invalid authorization header")]
    InvalidAuthHeader,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Insufficient permissions: {0}")]
    InsufficientPermissions(String),

    #[error("Authentication error: {0}")]
    Internal(String),
}
