//! API route definitions.

use axum::http::{HeaderValue, Method, header};
use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::auth::auth_middleware;

use super::handlers;
use super::handlers::{admin, auth as auth_handlers, search};
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state);

    // Tracing layer with request spans and timing
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    // Clone auth state for middleware
    let auth_state = state.auth.clone();

    // Protected routes (require a valid Bearer token; the user-management
    // handlers additionally require an elevated role via RequireElevated)
    let protected_routes = Router::new()
        .route("/me", get(auth_handlers::get_me))
        .route("/users", get(admin::list_users).post(admin::create_user))
        .route(
            "/users/{user_id}",
            get(admin::get_user)
                .put(admin::update_user)
                .delete(admin::delete_user),
        )
        .layer(middleware::from_fn_with_state(auth_state, auth_middleware))
        .with_state(state.clone());

    // Public routes (no authentication)
    let public_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/register", post(auth_handlers::register))
        .route("/auth/login", post(auth_handlers::login))
        .route(
            "/auth/verify-email/{user_id}/{token}",
            get(auth_handlers::verify_email),
        )
        // The public search; /users/search is static so it never shadows
        // the protected /users/{user_id} routes
        .route("/users/search", get(search::search_users))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .layer(trace_layer)
}

/// Build the CORS layer from the configured origins.
///
/// With no valid origins configured, cross-origin requests are denied.
fn build_cors_layer(state: &AppState) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];

    let headers = [header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT];

    let origins: Vec<HeaderValue> = state
        .auth
        .allowed_origins()
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("CORS: Invalid origin in config: {}", origin);
                None
            })
        })
        .collect();

    if origins.is_empty() {
        tracing::warn!("CORS: No valid origins configured, denying all cross-origin requests");
        CorsLayer::new().allow_origin(AllowOrigin::exact(HeaderValue::from_static("null")))
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(headers)
    }
}
