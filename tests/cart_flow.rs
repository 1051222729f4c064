mod common;

use condiment_shop::{
    dto::cart::Direction,
    error::AppError,
    middleware::auth::AuthUser,
    services::cart_service,
};
use uuid::Uuid;

#[tokio::test]
async fn increase_and_decrease_follow_clamped_count() -> anyhow::Result<()> {
    let app = common::setup().await?;
    let state = &app.state;
    let admin = common::admin(state).await?;
    let user = common::shopper(state).await?;
    let item = common::create_item(state, &admin, "Maple Syrup", 1499, 10).await?;

    let steps = [
        (Direction::Decrease, 0),
        (Direction::Increase, 1),
        (Direction::Increase, 2),
        (Direction::Decrease, 1),
        (Direction::Decrease, 0),
        (Direction::Decrease, 0),
        (Direction::Increase, 1),
    ];
    for (direction, expected) in steps {
        let resp = cart_service::add_or_increment(state, &user, item.id, direction).await?;
        let line = resp.data.expect("line quantity");
        assert_eq!(line.item_id, item.id);
        assert_eq!(line.quantity, expected, "after {direction:?}");
    }

    let cart = cart_service::view_cart(state, &user).await?.data.expect("cart");
    assert_eq!(cart.lines.len(), 1);
    assert_eq!(cart.lines[0].quantity, 1);
    assert_eq!(cart.total, 1499);
    Ok(())
}

// On in-memory SQLite the single pooled connection queues these calls, so
// this checks the counting. The Postgres variant below checks the locking.
#[tokio::test]
async fn concurrent_increases_are_all_counted() -> anyhow::Result<()> {
    let app = common::setup().await?;
    let admin = common::admin(&app.state).await?;
    let user = common::shopper(&app.state).await?;
    let item = common::create_item(&app.state, &admin, "Hot Honey", 899, 50).await?;
    increase_concurrently(&app, &user, item.id, 899).await
}

#[tokio::test]
async fn concurrent_increases_are_all_counted_on_postgres() -> anyhow::Result<()> {
    let Some(app) = common::setup_postgres().await? else {
        return Ok(());
    };
    let run = Uuid::new_v4().simple().to_string();
    let admin = common::create_user(&app.state, &format!("admin_{run}"), "pw", true).await?;
    let user = common::create_user(&app.state, &format!("shopper_{run}"), "pw", false).await?;
    let item =
        common::create_item(&app.state, &admin, &format!("Hot Honey {run}"), 899, 50).await?;
    increase_concurrently(&app, &user, item.id, 899).await
}

async fn increase_concurrently(
    app: &common::TestApp,
    user: &AuthUser,
    item_id: Uuid,
    price: i64,
) -> anyhow::Result<()> {
    const CALLERS: i32 = 12;
    let mut handles = Vec::new();
    for _ in 0..CALLERS {
        let state = app.state.clone();
        let user = user.clone();
        handles.push(tokio::spawn(async move {
            cart_service::add_or_increment(&state, &user, item_id, Direction::Increase).await
        }));
    }
    for handle in handles {
        handle.await??;
    }

    let cart = cart_service::view_cart(&app.state, user)
        .await?
        .data
        .expect("cart");
    assert_eq!(cart.lines.len(), 1);
    assert_eq!(cart.lines[0].quantity, CALLERS);
    assert_eq!(cart.total, price * i64::from(CALLERS));
    Ok(())
}

#[tokio::test]
async fn unknown_item_is_not_found() -> anyhow::Result<()> {
    let app = common::setup().await?;
    let user = common::shopper(&app.state).await?;

    let result =
        cart_service::add_or_increment(&app.state, &user, Uuid::new_v4(), Direction::Increase)
            .await;
    assert!(matches!(result, Err(AppError::NotFound)));

    let cart = cart_service::view_cart(&app.state, &user)
        .await?
        .data
        .expect("cart");
    assert!(cart.lines.is_empty());
    assert_eq!(cart.total, 0);
    Ok(())
}

#[tokio::test]
async fn cart_view_keeps_insertion_order_and_hides_zero_lines() -> anyhow::Result<()> {
    let app = common::setup().await?;
    let state = &app.state;
    let admin = common::admin(state).await?;
    let user = common::shopper(state).await?;
    let jam = common::create_item(state, &admin, "Fig Jam", 1199, 5).await?;
    let syrup = common::create_item(state, &admin, "Birch Syrup", 1999, 5).await?;
    let sauce = common::create_item(state, &admin, "Ghost Pepper", 699, 5).await?;

    cart_service::add_or_increment(state, &user, jam.id, Direction::Increase).await?;
    cart_service::add_or_increment(state, &user, syrup.id, Direction::Increase).await?;
    cart_service::add_or_increment(state, &user, syrup.id, Direction::Increase).await?;
    cart_service::add_or_increment(state, &user, sauce.id, Direction::Increase).await?;
    cart_service::add_or_increment(state, &user, sauce.id, Direction::Decrease).await?;

    let cart = cart_service::view_cart(state, &user).await?.data.expect("cart");
    let names: Vec<&str> = cart.lines.iter().map(|l| l.item.name.as_str()).collect();
    assert_eq!(names, vec!["Fig Jam", "Birch Syrup"]);
    assert_eq!(cart.lines[1].subtotal, 2 * 1999);
    assert_eq!(cart.total, 1199 + 2 * 1999);
    Ok(())
}

#[tokio::test]
async fn carts_are_per_user() -> anyhow::Result<()> {
    let app = common::setup().await?;
    let state = &app.state;
    let admin = common::admin(state).await?;
    let alice = common::create_user(state, "alice", "pw", false).await?;
    let bob = common::create_user(state, "bob", "pw", false).await?;
    let item = common::create_item(state, &admin, "Peach Jam", 899, 5).await?;

    cart_service::add_or_increment(state, &alice, item.id, Direction::Increase).await?;
    cart_service::add_or_increment(state, &alice, item.id, Direction::Increase).await?;
    let bob_line = cart_service::add_or_increment(state, &bob, item.id, Direction::Increase)
        .await?
        .data
        .expect("line");

    assert_eq!(bob_line.quantity, 1);
    let alice_cart = cart_service::view_cart(state, &alice).await?.data.expect("cart");
    assert_eq!(alice_cart.lines[0].quantity, 2);
    Ok(())
}
