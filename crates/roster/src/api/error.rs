//! Unified API error handling with structured responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::auth::AuthError;

/// API error type with structured responses.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Conflict(_) => "CONFLICT",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Categorize an anyhow error into the appropriate ApiError variant.
    ///
    /// The domain layer raises `anyhow` errors with stable message shapes;
    /// this is the one place they map to HTTP semantics. Patterns
    /// recognized:
    /// - "not found" -> NotFound
    /// - "already taken" / "already registered" / "already exists" -> Conflict
    /// - "locked" -> BadRequest (the login endpoint's lockout contract)
    /// - "invalid" / "must be" / "cannot" -> BadRequest
    /// - "unauthorized" / "authentication" -> Unauthorized
    /// - "forbidden" / "permission" -> Forbidden
    /// - Default -> Internal
    pub fn from_anyhow(err: anyhow::Error) -> Self {
        let msg = err.to_string();
        let msg_lower = msg.to_lowercase();

        if msg_lower.contains("not found") {
            ApiError::NotFound(msg)
        } else if msg_lower.contains("already taken")
            || msg_lower.contains("already registered")
            || msg_lower.contains("already exists")
        {
            ApiError::Conflict(msg)
        } else if msg_lower.contains("locked")
            || msg_lower.contains("invalid")
            || msg_lower.contains("must be")
            || msg_lower.contains("cannot")
        {
            ApiError::BadRequest(msg)
        } else if msg_lower.contains("unauthorized") || msg_lower.contains("authentication") {
            ApiError::Unauthorized(msg)
        } else if msg_lower.contains("forbidden") || msg_lower.contains("permission") {
            ApiError::Forbidden(msg)
        } else {
            ApiError::Internal(msg)
        }
    }
}

/// Structured error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();
        let message = self.to_string();

        // Server faults are logged loudly, client errors quietly
        match &self {
            ApiError::Internal(msg) => {
                error!(error_code = code, message = %msg, "API error");
            }
            ApiError::Unauthorized(msg) | ApiError::Forbidden(msg) => {
                warn!(error_code = code, message = %msg, "Request rejected");
            }
            _ => {
                tracing::debug!(error_code = code, message = %message, "Client error");
            }
        }

        let body = ErrorResponse {
            error: message,
            code,
        };

        (status, Json(body)).into_response()
    }
}

/// Convert anyhow errors to API errors using the centralized categorization.
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::from_anyhow(err)
    }
}

/// Convert auth errors to API errors.
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingAuthHeader | AuthError::InvalidAuthHeader => {
                ApiError::Unauthorized("Missing or invalid authorization".to_string())
            }
            AuthError::InvalidToken(msg) => ApiError::Unauthorized(format!("Invalid token: {}", msg)),
            AuthError::TokenExpired => ApiError::Unauthorized("Token has expired".to_string()),
            AuthError::InvalidCredentials => {
                ApiError::Unauthorized("Invalid credentials".to_string())
            }
            AuthError::InsufficientPermissions(msg) => ApiError::Forbidden(msg),
            AuthError::Internal(msg) => {
                ApiError::Internal(format!("Authentication error: {}", msg))
            }
        }
    }
}

/// Auth errors surface through the same structured response shape.
impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
