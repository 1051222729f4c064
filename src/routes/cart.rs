use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::cart::{CartLineQuantity, CartView, Direction},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::cart_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/cart", get(view_cart))
        .route("/add-to-cart/{id}/{direction}", get(add_to_cart))
}

#[utoipa::path(
    get,
    path = "/api/cart",
    responses(
        (status = 200, description = "Lines with a positive quantity and the cart total", body = ApiResponse<CartView>),
        (status = 401, description = "Login required")
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn view_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let resp = cart_service::view_cart(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/add-to-cart/{id}/{direction}",
    params(
        ("id" = Uuid, Path, description = "Item ID"),
        ("direction" = Direction, Path, description = "increase or decrease")
    ),
    responses(
        (status = 200, description = "Updated line quantity", body = ApiResponse<CartLineQuantity>),
        (status = 401, description = "Login required"),
        (status = 404, description = "Item not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, direction)): Path<(Uuid, Direction)>,
) -> AppResult<Json<ApiResponse<CartLineQuantity>>> {
    let resp = cart_service::add_or_increment(&state, &user, id, direction).await?;
    Ok(Json(resp))
}
