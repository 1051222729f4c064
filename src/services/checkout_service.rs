use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{CheckoutRedirect, OrderWithItems},
    entity::{
        checkout_sessions::{
            ActiveModel as SessionActive, Column as SessionCol, Entity as CheckoutSessions,
            Model as SessionModel, PaidLine, PaidLines, SessionStatus,
        },
        items::Model as ItemModel,
        line_items::Model as LineModel,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    payments::{CheckoutLine, CheckoutSessionRequest, PaymentError},
    services::{
        cart_service::{find_cart, priced_lines},
        order_service,
    },
    state::AppState,
};

pub const CART_EMPTY_PATH: &str = "/api/cart-empty";

#[derive(Debug)]
pub enum CheckoutOutcome {
    EmptyCart,
    Redirect(CheckoutRedirect),
}

#[derive(Debug)]
pub enum FinalizeOutcome {
    Finalized(OrderWithItems),
    AlreadyFinalized(OrderWithItems),
    /// Payment went through but the session carries no lines.
    NothingToFinalize,
}

/// Start a hosted checkout for the user's cart.
///
/// Nothing local is held open while the provider is called, and the cart is
/// never modified here.
pub async fn begin_checkout(state: &AppState, user: &AuthUser) -> AppResult<CheckoutOutcome> {
    let lines = match find_cart(&state.orm, user.user_id).await? {
        Some(cart) => priced_lines(&state.orm, cart.id).await?,
        None => Vec::new(),
    };
    if lines.is_empty() {
        return Ok(CheckoutOutcome::EmptyCart);
    }
    check_stock(&lines)?;
    let paid = snapshot_lines(&lines);

    let base = &state.config.public_base_url;
    let request = CheckoutSessionRequest {
        lines: build_manifest(&paid),
        shipping_rate_ids: state.config.payments.shipping_rate_ids.clone(),
        success_url: format!("{base}/api/success?session_id={{CHECKOUT_SESSION_ID}}"),
        cancel_url: format!("{base}/api/cancel?session_id={{CHECKOUT_SESSION_ID}}"),
        client_reference_id: user.user_id.to_string(),
    };

    let session = state
        .payments
        .create_checkout_session(&request)
        .await
        .inspect_err(|err| {
            tracing::warn!(user_id = %user.user_id, error = %err, "checkout session creation failed");
        })?;
    let url = session
        .url
        .clone()
        .ok_or_else(|| PaymentError::Parse("checkout session has no url".into()))?;

    let now = Utc::now();
    SessionActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        remote_session_id: Set(session.id.clone()),
        status: Set(SessionStatus::Pending),
        order_id: Set(None),
        manifest: Set(PaidLines(paid)),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "checkout_begin",
        "checkout_sessions",
        serde_json::json!({ "session_id": session.id, "lines": request.lines.len() }),
    )
    .await;

    tracing::info!(user_id = %user.user_id, session_id = %session.id, "checkout session created");
    Ok(CheckoutOutcome::Redirect(CheckoutRedirect {
        session_id: session.id,
        url,
    }))
}

/// Success callback: verify payment with the provider, then finalize.
///
/// Safe to call repeatedly for the same session.
pub async fn complete_checkout(state: &AppState, session_id: &str) -> AppResult<FinalizeOutcome> {
    let record = find_session(state, session_id).await?;
    if let Some(order) = recorded_order(state, &record).await? {
        return Ok(FinalizeOutcome::AlreadyFinalized(order));
    }

    let remote = state.payments.retrieve_checkout_session(session_id).await?;
    if !remote.payment_status.is_settled() {
        return Err(AppError::BadRequest("Payment has not been completed".into()));
    }

    if let Some(order) = order_service::finalize_session(state, record.id).await? {
        return Ok(FinalizeOutcome::Finalized(order));
    }

    // A concurrent callback for this session may have won the session lock.
    let record = find_session(state, session_id).await?;
    match recorded_order(state, &record).await? {
        Some(order) => Ok(FinalizeOutcome::AlreadyFinalized(order)),
        None => {
            tracing::warn!(session_id, user_id = %record.user_id, "paid session had no lines to finalize");
            Ok(FinalizeOutcome::NothingToFinalize)
        }
    }
}

async fn find_session(state: &AppState, session_id: &str) -> AppResult<SessionModel> {
    CheckoutSessions::find()
        .filter(SessionCol::RemoteSessionId.eq(session_id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)
}

async fn recorded_order(
    state: &AppState,
    record: &SessionModel,
) -> AppResult<Option<OrderWithItems>> {
    match (record.status, record.order_id) {
        (SessionStatus::Completed, Some(order_id)) => {
            Ok(Some(order_service::load_order(state, order_id).await?))
        }
        _ => Ok(None),
    }
}

fn check_stock(lines: &[(LineModel, ItemModel)]) -> AppResult<()> {
    for (line, item) in lines {
        if line.quantity > item.stock {
            return Err(AppError::BadRequest(format!(
                "Only {} of {} left in stock",
                item.stock, item.name
            )));
        }
    }
    Ok(())
}

/// What the customer is about to be billed for: every line with a positive
/// quantity, in cart order, at the current price.
pub fn snapshot_lines(lines: &[(LineModel, ItemModel)]) -> Vec<PaidLine> {
    lines
        .iter()
        .filter(|(line, _)| line.quantity > 0)
        .map(|(line, item)| PaidLine {
            item_id: item.id,
            price_id: item.remote_price_id.clone(),
            quantity: line.quantity,
            unit_price: item.price,
        })
        .collect()
}

/// Provider line items for a snapshot.
pub fn build_manifest(paid: &[PaidLine]) -> Vec<CheckoutLine> {
    paid.iter()
        .map(|line| CheckoutLine {
            price_id: line.price_id.clone(),
            quantity: i64::from(line.quantity),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Unit};

    fn item(name: &str, price_id: &str, stock: i32) -> ItemModel {
        ItemModel {
            id: Uuid::new_v4(),
            name: name.into(),
            category: Category::Syrup,
            price: 1200,
            unit: Unit::Oz,
            unit_amount: 12.0,
            stock,
            img_url: "https://img.test/a.png".into(),
            description: "test".into(),
            remote_product_id: format!("prod_{name}"),
            remote_price_id: price_id.into(),
            created_at: Utc::now().into(),
        }
    }

    fn line(item: &ItemModel, quantity: i32) -> LineModel {
        LineModel {
            id: Uuid::new_v4(),
            item_id: Some(item.id),
            cart_id: Some(Uuid::new_v4()),
            order_id: None,
            quantity,
            unit_price: None,
            created_at: Utc::now().into(),
        }
    }

    #[test]
    fn manifest_skips_zero_quantity_lines() {
        let a = item("a", "price_a", 10);
        let b = item("b", "price_b", 10);
        let lines = vec![(line(&a, 2), a.clone()), (line(&b, 0), b.clone())];

        let paid = snapshot_lines(&lines);
        assert_eq!(paid.len(), 1);
        assert_eq!(paid[0].item_id, a.id);
        assert_eq!(paid[0].unit_price, 1200);
        assert_eq!(
            build_manifest(&paid),
            vec![CheckoutLine {
                price_id: "price_a".into(),
                quantity: 2,
            }]
        );
    }

    #[test]
    fn stock_shortfall_is_reported() {
        let a = item("Maple", "price_a", 1);
        let lines = vec![(line(&a, 2), a.clone())];
        let err = check_stock(&lines).unwrap_err();
        assert!(err.to_string().contains("Maple"));
    }
}
