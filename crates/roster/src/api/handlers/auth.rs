//! Registration, login and email-verification handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::auth::CurrentUser;
use crate::user::{AdminUser, CreateUserRequest, User};

/// Registration request.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub nickname: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
}

impl From<RegisterRequest> for CreateUserRequest {
    fn from(request: RegisterRequest) -> Self {
        Self {
            email: request.email,
            password: request.password,
            nickname: request.nickname,
            first_name: request.first_name,
            last_name: request.last_name,
            bio: request.bio,
            profile_picture_url: None,
            github_profile_url: None,
            linkedin_profile_url: None,
            // Role and verification state are the service's decision.
            role: None,
            is_professional: None,
        }
    }
}

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

/// Message-only response body.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Send the verification email for a new account, if it needs one.
///
/// Delivery failures are logged and never fail the request; the token stays
/// in the database so verification can be re-sent out of band.
pub(crate) async fn send_verification_email(state: &AppState, user: &User) {
    if user.email_verified {
        return;
    }
    let Some(token) = user.verification_token.as_deref() else {
        return;
    };

    if let Err(e) = state
        .mailer
        .send_verification(&user.email, &user.id, token)
        .await
    {
        warn!(
            user_id = %user.id,
            error = ?e,
            "Failed to send verification email (non-fatal)"
        );
    }
}

/// Register a new account.
#[instrument(skip(state, request), fields(email = %request.email))]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AdminUser>)> {
    let user = state.users.register_user(request.into()).await?;

    send_verification_email(&state, &user).await;

    info!(user_id = %user.id, "User registered successfully");
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Log in and receive an access token.
#[instrument(skip(state, request), fields(email = %request.email))]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    // A locked account surfaces as an error here (400); a plain rejection is
    // a 401 below.
    let user = state
        .users
        .verify_credentials(&request.email, &request.password)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Incorrect email or password."))?;

    let token = state.auth.generate_token(&user)?;

    info!(user_id = %user.id, "User logged in successfully");
    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer",
    }))
}

/// Verify an email address with the mailed token.
#[instrument(skip(state, token))]
pub async fn verify_email(
    State(state): State<AppState>,
    Path((user_id, token)): Path<(String, String)>,
) -> ApiResult<Json<MessageResponse>> {
    if state.users.verify_email(&user_id, &token).await? {
        Ok(Json(MessageResponse {
            message: "Email verified successfully",
        }))
    } else {
        Err(ApiError::bad_request("Invalid or expired verification token"))
    }
}

/// Get the current user's own record.
#[instrument(skip(state, user))]
pub async fn get_me(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<AdminUser>> {
    state
        .users
        .get_user(user.id())
        .await?
        .map(|u| Json(u.into()))
        .ok_or_else(|| ApiError::not_found("User not found"))
}
