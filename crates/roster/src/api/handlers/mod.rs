//! HTTP request handlers.

pub mod admin;
pub mod auth;
pub mod search;

use axum::Json;
use serde::Serialize;

/// A page of results. Both response shapes (public and admin) share this
/// envelope.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub size: i64,
}

/// Health check endpoint.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
