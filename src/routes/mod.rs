use axum::{
    Json, Router,
    http::{StatusCode, Uri},
    routing::get,
};

use crate::{
    response::{ApiResponse, Notice},
    state::AppState,
};

pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod doc;
pub mod health;
pub mod orders;
pub mod params;
pub mod profile;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .merge(catalog::router())
        .merge(auth::router())
        .merge(profile::router())
        .merge(admin::router())
        .merge(cart::router())
        .merge(checkout::router())
        .merge(orders::router())
}

/// Health, the `/api` surface, docs and the JSON 404 fallback, bound to `state`.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", create_api_router())
        // A nested "/" only matches "/api".
        .route("/api/", get(catalog::list_items))
        .merge(doc::scalar_docs())
        .fallback(not_found)
        .with_state(state)
}

async fn not_found(uri: Uri) -> (StatusCode, Json<ApiResponse<Notice>>) {
    let body = ApiResponse::notice(format!("Not Found: {}", uri.path()), Some("/api"));
    (StatusCode::NOT_FOUND, Json(body))
}
