use axum::{
    Json, Router,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    dto::orders::OrderWithItems,
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta, Notice},
    services::checkout_service::{self, CART_EMPTY_PATH, CheckoutOutcome, FinalizeOutcome},
    state::AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct SessionQuery {
    pub session_id: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create-checkout-session", post(create_checkout_session))
        .route("/success", get(success))
        .route("/cancel", get(cancel))
        .route("/cart-empty", get(cart_empty))
}

#[utoipa::path(
    post,
    path = "/api/create-checkout-session",
    responses(
        (status = 303, description = "Redirect to the hosted checkout page, or to /api/cart-empty"),
        (status = 400, description = "Not enough stock"),
        (status = 401, description = "Login required"),
        (status = 502, description = "Payment provider unavailable, retry later")
    ),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn create_checkout_session(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Redirect> {
    match checkout_service::begin_checkout(&state, &user).await? {
        CheckoutOutcome::EmptyCart => Ok(Redirect::to(CART_EMPTY_PATH)),
        CheckoutOutcome::Redirect(session) => Ok(Redirect::to(&session.url)),
    }
}

#[utoipa::path(
    get,
    path = "/api/success",
    params(("session_id" = String, Query, description = "Checkout session id from the provider")),
    responses(
        (status = 200, description = "Order placed for the paid session", body = ApiResponse<OrderWithItems>),
        (status = 400, description = "Session not paid"),
        (status = 404, description = "Unknown session")
    ),
    tag = "Checkout"
)]
pub async fn success(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> AppResult<Response> {
    let Some(session_id) = query.session_id.filter(|s| !s.is_empty()) else {
        return Err(AppError::BadRequest("session_id is required".to_string()));
    };

    let resp = match checkout_service::complete_checkout(&state, &session_id).await? {
        FinalizeOutcome::Finalized(order) => {
            Json(ApiResponse::success("Order placed", order, Some(Meta::empty()))).into_response()
        }
        FinalizeOutcome::AlreadyFinalized(order) => {
            Json(ApiResponse::success("Order already placed", order, Some(Meta::empty())))
                .into_response()
        }
        FinalizeOutcome::NothingToFinalize => {
            Json(ApiResponse::notice("Nothing to finalize", Some("/api/orders"))).into_response()
        }
    };
    Ok(resp)
}

#[utoipa::path(
    get,
    path = "/api/cancel",
    params(("session_id" = Option<String>, Query, description = "Abandoned checkout session")),
    responses((status = 200, description = "Checkout abandoned, cart kept", body = ApiResponse<Notice>)),
    tag = "Checkout"
)]
pub async fn cancel(Query(query): Query<SessionQuery>) -> Json<ApiResponse<Notice>> {
    if let Some(session_id) = query.session_id.as_deref() {
        tracing::info!(session_id, "checkout cancelled");
    }
    Json(ApiResponse::notice(
        "Checkout cancelled, your cart is unchanged",
        Some("/api/cart"),
    ))
}

#[utoipa::path(
    get,
    path = "/api/cart-empty",
    responses((status = 200, description = "Nothing to check out", body = ApiResponse<Notice>)),
    tag = "Checkout"
)]
pub async fn cart_empty() -> Json<ApiResponse<Notice>> {
    Json(ApiResponse::notice("Your cart is empty", Some("/api")))
}
