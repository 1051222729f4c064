use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait, Unchanged,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit,
    dto::items::{CreateItemRequest, UpdateItemRequest},
    entity::{
        items::{ActiveModel as ItemActive, Column as ItemCol, Entity as Items, Model as ItemModel},
        line_items::{Column as LineCol, Entity as LineItems},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Item,
    payments::{PaymentGateway, ProductDetails, ProductUpdate},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Register a new catalog item with the payment provider, then store it.
///
/// The remote product and price are created first. If pricing fails the
/// product is deactivated again and nothing is stored locally.
pub async fn create_item(
    state: &AppState,
    user: &AuthUser,
    payload: CreateItemRequest,
) -> AppResult<ApiResponse<Item>> {
    ensure_admin(user)?;
    payload.validate()?;
    ensure_name_free(state, &payload.name, None).await?;

    let gateway = state.payments.as_ref();
    let product = gateway
        .create_product(&ProductDetails {
            name: payload.name.clone(),
            description: payload.description.clone(),
            image_url: payload.img_url.clone(),
        })
        .await?;

    let price = match gateway.create_price(&product.id, payload.price).await {
        Ok(price) => price,
        Err(err) => {
            tracing::warn!(product_id = %product.id, error = %err, "price creation failed, retiring product");
            retire_product(gateway, &product.id).await;
            return Err(err.into());
        }
    };

    let item = ItemActive {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        category: Set(payload.category),
        price: Set(payload.price),
        unit: Set(payload.unit),
        unit_amount: Set(payload.unit_amount),
        stock: Set(payload.stock),
        img_url: Set(payload.img_url),
        description: Set(payload.description),
        remote_product_id: Set(product.id),
        remote_price_id: Set(price.id),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "item_create",
        "items",
        serde_json::json!({ "item_id": item.id, "price": item.price }),
    )
    .await;

    tracing::info!(item_id = %item.id, name = %item.name, "item created");
    Ok(ApiResponse::success(
        "Item added",
        item.into(),
        Some(Meta::empty()),
    ))
}

/// Apply a partial update. A changed price mints a new remote price and
/// retires the previous one so exactly one stays active.
pub async fn update_item(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateItemRequest,
) -> AppResult<ApiResponse<Item>> {
    ensure_admin(user)?;
    payload.validate()?;

    let existing = Items::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if let Some(name) = payload.name.as_deref().filter(|n| *n != existing.name) {
        ensure_name_free(state, name, Some(id)).await?;
    }

    let gateway = state.payments.as_ref();
    gateway
        .update_product(
            &existing.remote_product_id,
            &ProductUpdate {
                details: Some(merged_details(&existing, &payload)),
                active: None,
            },
        )
        .await?;

    let new_price = match payload.price.filter(|p| *p != existing.price) {
        Some(amount) => {
            match gateway.create_price(&existing.remote_product_id, amount).await {
                Ok(price) => Some((amount, price.id)),
                Err(err) => {
                    revert_details(gateway, &existing).await;
                    return Err(err.into());
                }
            }
        }
        None => None,
    };

    let item = match item_changes(id, &payload, new_price.as_ref())
        .update(&state.orm)
        .await
    {
        Ok(item) => item,
        Err(err) => {
            tracing::warn!(item_id = %id, error = %err, "local update failed, undoing remote changes");
            if let Some((_, price_id)) = &new_price {
                retire_price(gateway, price_id).await;
            }
            revert_details(gateway, &existing).await;
            return Err(err.into());
        }
    };

    // The old price is retired only once the row points at its replacement.
    if let Some((_, price_id)) = &new_price {
        if let Err(err) = gateway.deactivate_price(&existing.remote_price_id).await {
            tracing::warn!(
                item_id = %id,
                price_id = %existing.remote_price_id,
                error = %err,
                "old price could not be retired, rolling back the update"
            );
            if let Err(undo) = previous_values(&existing, &payload, true)
                .update(&state.orm)
                .await
            {
                tracing::error!(item_id = %id, error = %undo, "item row left on the new price");
            }
            retire_price(gateway, price_id).await;
            revert_details(gateway, &existing).await;
            return Err(err.into());
        }
    }

    audit::record(
        &state.orm,
        Some(user.user_id),
        "item_update",
        "items",
        serde_json::json!({ "item_id": item.id, "repriced": new_price.is_some() }),
    )
    .await;

    Ok(ApiResponse::success(
        "Item updated",
        item.into(),
        Some(Meta::empty()),
    ))
}

/// Retire the remote product and remove the item. Open cart lines go with
/// it; order lines keep their snapshot but lose the item reference.
pub async fn delete_item(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Item>> {
    ensure_admin(user)?;

    let existing = Items::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    state
        .payments
        .deactivate_product(&existing.remote_product_id)
        .await?;

    let txn = state.orm.begin().await?;
    LineItems::delete_many()
        .filter(LineCol::ItemId.eq(id))
        .filter(LineCol::CartId.is_not_null())
        .exec(&txn)
        .await?;
    LineItems::update_many()
        .col_expr(LineCol::ItemId, Expr::value(Option::<Uuid>::None))
        .filter(LineCol::ItemId.eq(id))
        .exec(&txn)
        .await?;
    Items::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "item_delete",
        "items",
        serde_json::json!({ "item_id": id, "name": existing.name }),
    )
    .await;

    tracing::info!(item_id = %id, "item deleted");
    Ok(ApiResponse::success(
        "Item deleted",
        existing.into(),
        Some(Meta::empty()),
    ))
}

async fn ensure_name_free(state: &AppState, name: &str, except: Option<Uuid>) -> AppResult<()> {
    let mut finder = Items::find().filter(ItemCol::Name.eq(name));
    if let Some(id) = except {
        finder = finder.filter(ItemCol::Id.ne(id));
    }
    if finder.one(&state.orm).await?.is_some() {
        return Err(AppError::BadRequest(format!("An item named {name} already exists")));
    }
    Ok(())
}

fn merged_details(existing: &ItemModel, payload: &UpdateItemRequest) -> ProductDetails {
    ProductDetails {
        name: payload.name.clone().unwrap_or_else(|| existing.name.clone()),
        description: payload
            .description
            .clone()
            .unwrap_or_else(|| existing.description.clone()),
        image_url: payload
            .img_url
            .clone()
            .unwrap_or_else(|| existing.img_url.clone()),
    }
}

/// The columns `payload` touches, plus the price pair when repriced.
fn item_changes(
    id: Uuid,
    payload: &UpdateItemRequest,
    new_price: Option<&(i64, String)>,
) -> ItemActive {
    let mut active = ItemActive {
        id: Unchanged(id),
        ..Default::default()
    };
    if let Some(name) = &payload.name {
        active.name = Set(name.clone());
    }
    if let Some(category) = payload.category {
        active.category = Set(category);
    }
    if let Some(unit) = payload.unit {
        active.unit = Set(unit);
    }
    if let Some(unit_amount) = payload.unit_amount {
        active.unit_amount = Set(unit_amount);
    }
    if let Some(img_url) = &payload.img_url {
        active.img_url = Set(img_url.clone());
    }
    if let Some(stock) = payload.stock {
        active.stock = Set(stock);
    }
    if let Some(description) = &payload.description {
        active.description = Set(description.clone());
    }
    if let Some((amount, price_id)) = new_price {
        active.price = Set(*amount);
        active.remote_price_id = Set(price_id.clone());
    }
    active
}

/// Undo of [`item_changes`]: the same columns, back at their previous values.
fn previous_values(existing: &ItemModel, payload: &UpdateItemRequest, repriced: bool) -> ItemActive {
    let mut active = ItemActive {
        id: Unchanged(existing.id),
        ..Default::default()
    };
    if payload.name.is_some() {
        active.name = Set(existing.name.clone());
    }
    if payload.category.is_some() {
        active.category = Set(existing.category);
    }
    if payload.unit.is_some() {
        active.unit = Set(existing.unit);
    }
    if payload.unit_amount.is_some() {
        active.unit_amount = Set(existing.unit_amount);
    }
    if payload.img_url.is_some() {
        active.img_url = Set(existing.img_url.clone());
    }
    if payload.stock.is_some() {
        active.stock = Set(existing.stock);
    }
    if payload.description.is_some() {
        active.description = Set(existing.description.clone());
    }
    if repriced {
        active.price = Set(existing.price);
        active.remote_price_id = Set(existing.remote_price_id.clone());
    }
    active
}

async fn revert_details(gateway: &dyn PaymentGateway, existing: &ItemModel) {
    let update = ProductUpdate {
        details: Some(ProductDetails {
            name: existing.name.clone(),
            description: existing.description.clone(),
            image_url: existing.img_url.clone(),
        }),
        active: None,
    };
    if let Err(err) = gateway.update_product(&existing.remote_product_id, &update).await {
        tracing::error!(
            product_id = %existing.remote_product_id,
            error = %err,
            "remote product details left ahead of the item"
        );
    }
}

async fn retire_price(gateway: &dyn PaymentGateway, price_id: &str) {
    if let Err(err) = gateway.deactivate_price(price_id).await {
        tracing::error!(price_id, error = %err, "new price left active");
    }
}

async fn retire_product(gateway: &dyn PaymentGateway, product_id: &str) {
    if let Err(err) = gateway.deactivate_product(product_id).await {
        tracing::error!(product_id, error = %err, "product left active after failed create");
    }
}
