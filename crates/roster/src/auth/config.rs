//! Authentication configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// JWT secret for HS256. Supports `env:VAR_NAME` indirection.
    pub jwt_secret: Option<String>,

    /// Access token lifetime in minutes.
    pub token_ttl_minutes: i64,

    /// Allowed CORS origins.
    pub allowed_origins: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            // No default JWT secret - must be explicitly configured
            jwt_secret: None,
            token_ttl_minutes: 30,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:8080".to_string(),
            ],
        }
    }
}

impl AuthConfig {
    /// Resolve the JWT secret, expanding `env:VAR_NAME` syntax.
    pub fn resolve_jwt_secret(&self) -> Result<Option<String>, ConfigValidationError> {
        match &self.jwt_secret {
            None => Ok(None),
            Some(value) => {
                if let Some(var_name) = value.strip_prefix("env:") {
                    match std::env::var(var_name) {
                        Ok(secret) if !secret.is_empty() => Ok(Some(secret)),
                        Ok(_) => Err(ConfigValidationError::EnvVarEmpty(var_name.to_string())),
                        Err(_) => Err(ConfigValidationError::EnvVarNotFound(var_name.to_string())),
                    }
                } else {
                    Ok(Some(value.clone()))
                }
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let secret = self
            .resolve_jwt_secret()?
            .ok_or(ConfigValidationError::MissingJwtSecret)?;

        if secret == "dev-secret-change-in-production" {
            return Err(ConfigValidationError::InsecureJwtSecret);
        }
        if secret.len() < 32 {
            return Err(ConfigValidationError::JwtSecretTooShort);
        }
        if self.token_ttl_minutes <= 0 {
            return Err(ConfigValidationError::InvalidTokenTtl);
        }

        Ok(())
    }

    /// Generate a secure random JWT secret.
    ///
    /// `rand::rng()` is backed by the OS's cryptographically secure RNG.
    pub fn generate_jwt_secret() -> String {
        use rand::Rng;

        const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
        const SECRET_LENGTH: usize = 64;

        let mut rng = rand::rng();
        (0..SECRET_LENGTH)
            .map(|_| {
                let idx = rng.random_range(0..CHARSET.len());
                CHARSET[idx] as char
            })
            .collect()
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigValidationError {
    #[error(
        "JWT secret is required. Set ROSTER__AUTH__JWT_SECRET or auth.jwt_secret in the config file."
    )]
    MissingJwtSecret,

    #[error("JWT secret cannot be the default insecure value. Please configure a secure secret.")]
    InsecureJwtSecret,

    #[error("JWT secret must be at least 32 characters long for security.")]
    JwtSecretTooShort,

    #[error("token_ttl_minutes must be positive.")]
    InvalidTokenTtl,

    #[error("Environment variable '{0}' not found (referenced via env:{0} in config).")]
    EnvVarNotFound(String),

    #[error("Environment variable '{0}' is empty (referenced via env:{0} in config).")]
    EnvVarEmpty(String),
}
