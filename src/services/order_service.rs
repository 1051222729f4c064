use std::collections::HashSet;

use chrono::{Duration, Utc};
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseTransaction, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{OrderList, OrderWithItems},
    entity::{
        carts::{Column as CartCol, Entity as Carts},
        checkout_sessions::{
            ActiveModel as SessionActive, Column as SessionCol, Entity as CheckoutSessions,
            PaidLine, SessionStatus,
        },
        items::{ActiveModel as ItemActive, Entity as Items},
        line_items::{ActiveModel as LineActive, Column as LineCol, Entity as LineItems},
        orders::{
            ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel,
        },
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderLine},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::cart_service::priced_lines,
    state::AppState,
};

/// Turn the user's whole cart into an order.
///
/// Returns `None` when there is no cart, or nothing in it with a positive
/// quantity, so a repeated call is a no-op.
pub async fn finalize_order(state: &AppState, user_id: Uuid) -> AppResult<Option<OrderWithItems>> {
    let txn = state.orm.begin().await?;

    let Some(order) = move_cart_into_order(&txn, user_id).await? else {
        txn.rollback().await?;
        return Ok(None);
    };

    txn.commit().await?;
    record_finalized(state, user_id, &order, None).await;
    Ok(Some(order))
}

/// Turn a paid checkout session into an order.
///
/// Only the quantities frozen on the session when it was created are
/// ordered; anything added to the cart since then stays in the cart.
/// Returns `None` when the session is no longer pending or has no lines.
pub async fn finalize_session(
    state: &AppState,
    session_id: Uuid,
) -> AppResult<Option<OrderWithItems>> {
    let txn = state.orm.begin().await?;

    let Some((user_id, order)) = move_paid_lines_into_order(&txn, session_id).await? else {
        txn.rollback().await?;
        return Ok(None);
    };

    txn.commit().await?;
    record_finalized(state, user_id, &order, Some(session_id)).await;
    Ok(Some(order))
}

async fn record_finalized(
    state: &AppState,
    user_id: Uuid,
    order: &OrderWithItems,
    session_id: Option<Uuid>,
) {
    let quantity: i32 = order.items.iter().map(|line| line.quantity).sum();
    tracing::info!(
        %user_id,
        order_id = %order.order.id,
        lines = order.items.len(),
        quantity,
        total = order.order.total_amount,
        "order finalized"
    );
    audit::record(
        &state.orm,
        Some(user_id),
        "order_finalize",
        "orders",
        serde_json::json!({ "order_id": order.order.id, "checkout_session": session_id }),
    )
    .await;
}

async fn move_cart_into_order(
    txn: &DatabaseTransaction,
    user_id: Uuid,
) -> AppResult<Option<OrderWithItems>> {
    let cart = Carts::find()
        .filter(CartCol::UserId.eq(user_id))
        .lock(LockType::Update)
        .one(txn)
        .await?;
    let Some(cart) = cart else {
        return Ok(None);
    };

    let lines = priced_lines(txn, cart.id).await?;
    if lines.is_empty() {
        return Ok(None);
    }

    let total_amount = lines
        .iter()
        .map(|(line, item)| item.price * i64::from(line.quantity))
        .sum();
    let order = insert_order(txn, user_id, total_amount).await?;

    let mut moved = Vec::with_capacity(lines.len());
    for (line, item) in &lines {
        let mut active: LineActive = line.clone().into();
        active.cart_id = Set(None);
        active.order_id = Set(Some(order.id));
        active.unit_price = Set(Some(item.price));
        moved.push(OrderLine::from(active.update(txn).await?));
    }

    decrement_stock(
        txn,
        lines.iter().map(|(line, item)| (item.id, line.quantity)).collect(),
    )
    .await?;

    // Whatever is left is zero-quantity lines.
    LineItems::delete_many()
        .filter(LineCol::CartId.eq(cart.id))
        .exec(txn)
        .await?;
    Carts::delete_by_id(cart.id).exec(txn).await?;

    Ok(Some(OrderWithItems {
        order: order.into(),
        items: moved,
    }))
}

async fn move_paid_lines_into_order(
    txn: &DatabaseTransaction,
    session_id: Uuid,
) -> AppResult<Option<(Uuid, OrderWithItems)>> {
    // The session row is the serialization point for duplicate callbacks.
    let session = CheckoutSessions::find_by_id(session_id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or(AppError::NotFound)?;
    if session.status != SessionStatus::Pending {
        return Ok(None);
    }

    let paid: Vec<PaidLine> = session
        .manifest
        .0
        .iter()
        .filter(|line| line.quantity > 0)
        .cloned()
        .collect();
    if paid.is_empty() {
        return Ok(None);
    }

    let cart = Carts::find()
        .filter(CartCol::UserId.eq(session.user_id))
        .lock(LockType::Update)
        .one(txn)
        .await?;

    let total_amount = paid
        .iter()
        .map(|line| line.unit_price * i64::from(line.quantity))
        .sum();
    let order = insert_order(txn, session.user_id, total_amount).await?;

    let in_catalog = decrement_stock(
        txn,
        paid.iter().map(|line| (line.item_id, line.quantity)).collect(),
    )
    .await?;

    let now = Utc::now();
    let mut moved = Vec::with_capacity(paid.len());
    for (idx, line) in paid.iter().enumerate() {
        // Distinct timestamps keep the billed order when the lines are read back.
        let created_at = now + Duration::microseconds(idx as i64);
        let row = LineActive {
            id: Set(Uuid::new_v4()),
            item_id: Set(in_catalog.contains(&line.item_id).then_some(line.item_id)),
            cart_id: Set(None),
            order_id: Set(Some(order.id)),
            quantity: Set(line.quantity),
            unit_price: Set(Some(line.unit_price)),
            created_at: Set(created_at.into()),
        }
        .insert(txn)
        .await?;
        moved.push(OrderLine::from(row));
    }

    if let Some(cart) = cart {
        settle_cart(txn, cart.id, &paid).await?;
    }

    let mut active: SessionActive = session.clone().into();
    active.status = Set(SessionStatus::Completed);
    active.order_id = Set(Some(order.id));
    active.updated_at = Set(Utc::now().into());
    active.update(txn).await?;

    Ok(Some((
        session.user_id,
        OrderWithItems {
            order: order.into(),
            items: moved,
        },
    )))
}

async fn insert_order(
    txn: &DatabaseTransaction,
    user_id: Uuid,
    total_amount: i64,
) -> Result<OrderModel, DbErr> {
    OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        total_amount: Set(total_amount),
        created_at: Set(Utc::now().into()),
    }
    .insert(txn)
    .await
}

/// Take purchased quantities out of stock, saturating at zero. Returns the
/// ids that still exist in the catalog.
async fn decrement_stock(
    txn: &DatabaseTransaction,
    mut purchased: Vec<(Uuid, i32)>,
) -> Result<HashSet<Uuid>, DbErr> {
    // Lock items in id order so concurrent finalizations cannot deadlock.
    purchased.sort_by_key(|(id, _)| *id);

    let mut found = HashSet::with_capacity(purchased.len());
    for (item_id, quantity) in purchased {
        let item = Items::find_by_id(item_id)
            .lock(LockType::Update)
            .one(txn)
            .await?;
        if let Some(item) = item {
            let stock = (item.stock - quantity).max(0);
            let mut active: ItemActive = item.into();
            active.stock = Set(stock);
            active.update(txn).await?;
            found.insert(item_id);
        }
    }
    Ok(found)
}

/// Remove paid quantities from the cart. Lines that reach zero are dropped,
/// and the cart goes once nothing is left in it.
async fn settle_cart(
    txn: &DatabaseTransaction,
    cart_id: Uuid,
    paid: &[PaidLine],
) -> Result<(), DbErr> {
    for line in paid {
        let cart_line = LineItems::find()
            .filter(LineCol::CartId.eq(cart_id))
            .filter(LineCol::ItemId.eq(line.item_id))
            .lock(LockType::Update)
            .one(txn)
            .await?;
        if let Some(cart_line) = cart_line {
            let left = (cart_line.quantity - line.quantity).max(0);
            let mut active: LineActive = cart_line.into();
            active.quantity = Set(left);
            active.update(txn).await?;
        }
    }

    LineItems::delete_many()
        .filter(LineCol::CartId.eq(cart_id))
        .filter(LineCol::Quantity.lte(0))
        .exec(txn)
        .await?;
    let remaining = LineItems::find()
        .filter(LineCol::CartId.eq(cart_id))
        .count(txn)
        .await?;
    if remaining == 0 {
        Carts::delete_by_id(cart_id).exec(txn).await?;
    }
    Ok(())
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = pagination.normalize();

    let finder = Orders::find()
        .filter(OrderCol::UserId.eq(user.user_id))
        .order_by_desc(OrderCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(ApiResponse::success(
        "OK",
        load_order(state, order.id).await?,
        Some(Meta::empty()),
    ))
}

pub async fn load_order(state: &AppState, id: Uuid) -> AppResult<OrderWithItems> {
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let items = LineItems::find()
        .filter(LineCol::OrderId.eq(order.id))
        .order_by_asc(LineCol::CreatedAt)
        .order_by_asc(LineCol::Id)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(OrderLine::from)
        .collect();

    Ok(OrderWithItems {
        order: order.into(),
        items,
    })
}

/// Sessions still waiting for their success callback.
pub async fn pending_session_count(state: &AppState, user_id: Uuid) -> AppResult<u64> {
    let count = CheckoutSessions::find()
        .filter(SessionCol::UserId.eq(user_id))
        .filter(SessionCol::Status.eq(SessionStatus::Pending))
        .count(&state.orm)
        .await?;
    Ok(count)
}
