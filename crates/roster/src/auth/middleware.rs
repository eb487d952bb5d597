//! JWT validation middleware and request extractors.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};

use super::claims::Claims;
use super::config::{AuthConfig, ConfigValidationError};
use super::error::AuthError;
use crate::user::User;

/// Shared authentication state: resolved signing keys plus token settings.
#[derive(Clone)]
pub struct AuthState {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl_minutes: i64,
    allowed_origins: Vec<String>,
}

impl AuthState {
    /// Build the auth state from a validated configuration.
    pub fn new(config: &AuthConfig) -> Result<Self, ConfigValidationError> {
        config.validate()?;
        let secret = config
            .resolve_jwt_secret()?
            .ok_or(ConfigValidationError::MissingJwtSecret)?;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            token_ttl_minutes: config.token_ttl_minutes,
            allowed_origins: config.allowed_origins.clone(),
        })
    }

    /// Issue an access token for a user.
    pub fn generate_token(&self, user: &User) -> Result<String, AuthError> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: user.role.to_string(),
            iat: now,
            exp: now + self.token_ttl_minutes * 60,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("Failed to sign token: {}", e)))
    }

    /// Validate a token and return its claims.
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default()).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken(e.to_string()),
            },
        )?;

        Ok(data.claims)
    }

    /// Configured CORS origins.
    pub fn allowed_origins(&self) -> &[String] {
        &self.allowed_origins
    }
}

/// The authenticated caller, inserted into request extensions by
/// [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub claims: Claims,
}

impl CurrentUser {
    /// User ID from the token subject.
    pub fn id(&self) -> &str {
        &self.claims.sub
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AuthError::MissingAuthHeader)
    }
}

/// Extractor requiring an `ADMIN` or `MANAGER` token.
#[derive(Debug, Clone)]
pub struct RequireElevated(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireElevated
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if !user.claims.is_elevated() {
            return Err(AuthError::InsufficientPermissions(
                "Admin or manager role required".to_string(),
            ));
        }
        Ok(RequireElevated(user))
    }
}

/// Middleware validating the Bearer token and attaching [`CurrentUser`].
pub async fn auth_middleware(
    State(auth): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?;

    let token = header_value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(AuthError::InvalidAuthHeader)?;

    let claims = auth.verify_token(token)?;
    request.extensions_mut().insert(CurrentUser { claims });

    Ok(next.run(request).await)
}
