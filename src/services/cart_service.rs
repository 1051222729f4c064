use chrono::Utc;
use sea_orm::sea_query::{LockType, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::cart::{CartLineQuantity, CartLineView, CartView, Direction},
    entity::{
        carts::{ActiveModel as CartActive, Column as CartCol, Entity as Carts, Model as CartModel},
        items::{Entity as Items, Model as ItemModel},
        line_items::{
            ActiveModel as LineActive, Column as LineCol, Entity as LineItems, Model as LineModel,
        },
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Step the quantity of `item_id` in the user's cart by one.
///
/// The cart row is share-locked so finalization cannot delete it underneath,
/// and the line row is locked for update so concurrent steps on the same line
/// apply one after another.
pub async fn add_or_increment(
    state: &AppState,
    user: &AuthUser,
    item_id: Uuid,
    direction: Direction,
) -> AppResult<ApiResponse<CartLineQuantity>> {
    let txn = state.orm.begin().await?;

    if Items::find_by_id(item_id).one(&txn).await?.is_none() {
        return Err(AppError::NotFound);
    }

    let cart = ensure_cart(&txn, user.user_id).await?;
    let line = ensure_line(&txn, cart.id, item_id).await?;

    let quantity = direction.apply(line.quantity);
    if quantity != line.quantity {
        let mut active: LineActive = line.into();
        active.quantity = Set(quantity);
        active.update(&txn).await?;
    }

    txn.commit().await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "cart_update",
        "line_items",
        serde_json::json!({ "item_id": item_id, "direction": direction, "quantity": quantity }),
    )
    .await;

    tracing::debug!(user_id = %user.user_id, %item_id, quantity, "cart line updated");
    Ok(ApiResponse::success(
        "OK",
        CartLineQuantity { item_id, quantity },
        None,
    ))
}

pub async fn view_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    let lines = match find_cart(&state.orm, user.user_id).await? {
        Some(cart) => priced_lines(&state.orm, cart.id).await?,
        None => Vec::new(),
    };

    let lines: Vec<CartLineView> = lines
        .into_iter()
        .map(|(line, item)| CartLineView {
            line_id: line.id,
            subtotal: item.price * i64::from(line.quantity),
            quantity: line.quantity,
            item: item.into(),
        })
        .collect();
    let total = lines.iter().map(|line| line.subtotal).sum();

    Ok(ApiResponse::success(
        "OK",
        CartView { lines, total },
        Some(Meta::empty()),
    ))
}

pub async fn find_cart<C>(conn: &C, user_id: Uuid) -> Result<Option<CartModel>, DbErr>
where
    C: ConnectionTrait,
{
    Carts::find()
        .filter(CartCol::UserId.eq(user_id))
        .one(conn)
        .await
}

/// Cart lines with quantity above zero, joined to their items, in insertion order.
pub async fn priced_lines<C>(conn: &C, cart_id: Uuid) -> Result<Vec<(LineModel, ItemModel)>, DbErr>
where
    C: ConnectionTrait,
{
    let rows = LineItems::find()
        .filter(LineCol::CartId.eq(cart_id))
        .filter(LineCol::Quantity.gt(0))
        .find_also_related(Items)
        .order_by_asc(LineCol::CreatedAt)
        .order_by_asc(LineCol::Id)
        .all(conn)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(line, item)| item.map(|item| (line, item)))
        .collect())
}

async fn ensure_cart<C>(txn: &C, user_id: Uuid) -> AppResult<CartModel>
where
    C: ConnectionTrait,
{
    let insert = Carts::insert(CartActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        created_at: Set(Utc::now().into()),
    })
    .on_conflict(OnConflict::column(CartCol::UserId).do_nothing().to_owned())
    .exec_without_returning(txn)
    .await;
    ignore_conflict(insert)?;

    Carts::find()
        .filter(CartCol::UserId.eq(user_id))
        .lock(LockType::Share)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("cart vanished during update")))
}

async fn ensure_line<C>(txn: &C, cart_id: Uuid, item_id: Uuid) -> AppResult<LineModel>
where
    C: ConnectionTrait,
{
    let insert = LineItems::insert(LineActive {
        id: Set(Uuid::new_v4()),
        item_id: Set(Some(item_id)),
        cart_id: Set(Some(cart_id)),
        order_id: Set(None),
        quantity: Set(0),
        unit_price: Set(None),
        created_at: Set(Utc::now().into()),
    })
    .on_conflict(
        OnConflict::columns([LineCol::CartId, LineCol::ItemId])
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(txn)
    .await;
    ignore_conflict(insert)?;

    LineItems::find()
        .filter(LineCol::CartId.eq(cart_id))
        .filter(LineCol::ItemId.eq(item_id))
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("cart line vanished during update")))
}

fn ignore_conflict(result: Result<u64, DbErr>) -> Result<(), DbErr> {
    match result {
        Ok(_) | Err(DbErr::RecordNotInserted) => Ok(()),
        Err(err) => Err(err),
    }
}
