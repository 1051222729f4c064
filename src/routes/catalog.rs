use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::items::ItemList,
    error::AppResult,
    models::{Category, Item},
    response::ApiResponse,
    routes::params::{ItemQuery, Pagination},
    services::catalog_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_items))
        .route("/syrups", get(list_syrups))
        .route("/hot-sauces", get(list_hot_sauces))
        .route("/jams", get(list_jams))
        .route("/item/{id}", get(get_item))
}

#[utoipa::path(
    get,
    path = "/api",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("q" = Option<String>, Query, description = "Search in name or description"),
        ("category" = Option<Category>, Query, description = "syrup, hot_sauce or jam"),
        ("sort_by" = Option<String>, Query, description = "name | price | created_at"),
        ("sort_order" = Option<String>, Query, description = "asc | desc")
    ),
    responses(
        (status = 200, description = "Catalog listing", body = ApiResponse<ItemList>)
    ),
    tag = "Catalog"
)]
pub async fn list_items(
    State(state): State<AppState>,
    Query(query): Query<ItemQuery>,
) -> AppResult<Json<ApiResponse<ItemList>>> {
    let resp = catalog_service::list_items(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/syrups",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20")
    ),
    responses((status = 200, description = "Syrups", body = ApiResponse<ItemList>)),
    tag = "Catalog"
)]
pub async fn list_syrups(
    state: State<AppState>,
    pagination: Query<Pagination>,
) -> AppResult<Json<ApiResponse<ItemList>>> {
    list_category(state, pagination, Category::Syrup).await
}

#[utoipa::path(
    get,
    path = "/api/hot-sauces",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20")
    ),
    responses((status = 200, description = "Hot sauces", body = ApiResponse<ItemList>)),
    tag = "Catalog"
)]
pub async fn list_hot_sauces(
    state: State<AppState>,
    pagination: Query<Pagination>,
) -> AppResult<Json<ApiResponse<ItemList>>> {
    list_category(state, pagination, Category::HotSauce).await
}

#[utoipa::path(
    get,
    path = "/api/jams",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20")
    ),
    responses((status = 200, description = "Jams", body = ApiResponse<ItemList>)),
    tag = "Catalog"
)]
pub async fn list_jams(
    state: State<AppState>,
    pagination: Query<Pagination>,
) -> AppResult<Json<ApiResponse<ItemList>>> {
    list_category(state, pagination, Category::Jam).await
}

async fn list_category(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
    category: Category,
) -> AppResult<Json<ApiResponse<ItemList>>> {
    let query = ItemQuery {
        page: pagination.page,
        per_page: pagination.per_page,
        category: Some(category),
        ..Default::default()
    };
    let resp = catalog_service::list_items(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/item/{id}",
    params(("id" = Uuid, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Item detail", body = ApiResponse<Item>),
        (status = 404, description = "Item not found")
    ),
    tag = "Catalog"
)]
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Item>>> {
    let resp = catalog_service::get_item(&state, id).await?;
    Ok(Json(resp))
}
