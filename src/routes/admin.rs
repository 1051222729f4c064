use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{post, put},
};
use uuid::Uuid;

use crate::{
    dto::items::{CreateItemRequest, UpdateItemRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Item,
    response::ApiResponse,
    services::admin_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/add-item", post(add_item))
        .route("/edit-item/{id}", put(edit_item))
        .route("/confirm-delete/{id}", post(delete_item).delete(delete_item))
}

#[utoipa::path(
    post,
    path = "/api/add-item",
    request_body = CreateItemRequest,
    responses(
        (status = 201, description = "Item created and priced", body = ApiResponse<Item>),
        (status = 400, description = "Invalid fields or duplicate name"),
        (status = 403, description = "Admin only"),
        (status = 502, description = "Payment provider unavailable")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn add_item(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateItemRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Item>>)> {
    let resp = admin_service::create_item(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/edit-item/{id}",
    params(("id" = Uuid, Path, description = "Item ID")),
    request_body = UpdateItemRequest,
    responses(
        (status = 200, description = "Item updated", body = ApiResponse<Item>),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Item not found"),
        (status = 502, description = "Payment provider unavailable")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn edit_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateItemRequest>,
) -> AppResult<Json<ApiResponse<Item>>> {
    let resp = admin_service::update_item(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/confirm-delete/{id}",
    params(("id" = Uuid, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Item deleted", body = ApiResponse<Item>),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Item not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Item>>> {
    let resp = admin_service::delete_item(&state, &user, id).await?;
    Ok(Json(resp))
}
