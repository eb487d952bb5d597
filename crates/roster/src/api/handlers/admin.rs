//! User-management handlers (admin or manager role required).

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::{info, instrument};

use super::Page;
use super::auth::send_verification_email;
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::auth::RequireElevated;
use crate::user::{AdminUser, CreateUserRequest, UpdateUserRequest};

fn default_page() -> i64 {
    1
}

fn default_size() -> i64 {
    10
}

/// Pagination parameters for the listing endpoint.
#[derive(Debug, Deserialize)]
pub struct ListUsersParams {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_size")]
    pub size: i64,
}

/// List users, newest first.
#[instrument(skip(state, _user))]
pub async fn list_users(
    State(state): State<AppState>,
    RequireElevated(_user): RequireElevated,
    Query(params): Query<ListUsersParams>,
) -> ApiResult<Json<Page<AdminUser>>> {
    if params.page < 1 {
        return Err(ApiError::bad_request("page must be >= 1"));
    }
    if !(1..=100).contains(&params.size) {
        return Err(ApiError::bad_request("size must be between 1 and 100"));
    }

    let (users, total) = state.users.list_users(params.page, params.size).await?;

    let items: Vec<AdminUser> = users.into_iter().map(Into::into).collect();
    info!(count = items.len(), "Listed users");
    Ok(Json(Page {
        items,
        total,
        page: params.page,
        size: params.size,
    }))
}

/// Get a specific user.
#[instrument(skip(state, _user))]
pub async fn get_user(
    State(state): State<AppState>,
    RequireElevated(_user): RequireElevated,
    Path(user_id): Path<String>,
) -> ApiResult<Json<AdminUser>> {
    state
        .users
        .get_user(&user_id)
        .await?
        .map(|u| Json(u.into()))
        .ok_or_else(|| ApiError::not_found(format!("User {} not found", user_id)))
}

/// Create a new user.
#[instrument(skip(state, _user, request), fields(email = %request.email))]
pub async fn create_user(
    State(state): State<AppState>,
    RequireElevated(_user): RequireElevated,
    Json(request): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<AdminUser>)> {
    let user = state.users.create_user(request).await?;

    // Admin-created accounts verify their address the same way
    // self-registered ones do.
    send_verification_email(&state, &user).await;

    info!(user_id = %user.id, "Created new user");
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Update a user.
#[instrument(skip(state, _user, request))]
pub async fn update_user(
    State(state): State<AppState>,
    RequireElevated(_user): RequireElevated,
    Path(user_id): Path<String>,
    Json(request): Json<UpdateUserRequest>,
) -> ApiResult<Json<AdminUser>> {
    let user = state.users.update_user(&user_id, request).await?;

    info!(user_id = %user.id, "Updated user");
    Ok(Json(user.into()))
}

/// Delete a user.
#[instrument(skip(state, _user))]
pub async fn delete_user(
    State(state): State<AppState>,
    RequireElevated(_user): RequireElevated,
    Path(user_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.users.delete_user(&user_id).await?;

    info!(user_id = %user_id, "Deleted user");
    Ok(StatusCode::NO_CONTENT)
}
