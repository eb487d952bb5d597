//! Public user search.

use axum::{
    Json,
    extract::{Query, State},
};
use tracing::instrument;

use super::Page;
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::user::{PublicUser, SearchQuery};

/// Search users with filters and pagination. Deliberately unauthenticated;
/// responses use the reduced public projection.
///
/// `sort` and `order` outside their enumerated sets never reach this
/// handler: parameter binding rejects them with a 400.
#[instrument(skip(state))]
pub async fn search_users(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Page<PublicUser>>> {
    query.validate().map_err(ApiError::bad_request)?;

    let (users, total) = state.users.search_users(&query).await?;

    let items: Vec<PublicUser> = users.iter().map(PublicUser::from).collect();
    Ok(Json(Page {
        items,
        total,
        page: query.page,
        size: query.size,
    }))
}
