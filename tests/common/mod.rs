#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use condiment_shop::{
    config::{AppConfig, PaymentBackend, PaymentConfig},
    db::run_migrations,
    dto::items::CreateItemRequest,
    entity::users::ActiveModel as UserActive,
    middleware::auth::AuthUser,
    models::{Category, Item, Unit},
    payments::FakeGateway,
    services::{admin_service, auth_service::hash_password},
    state::AppState,
};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, Set};
use secrecy::SecretString;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-secret";

pub struct TestApp {
    pub state: AppState,
    pub gateway: Arc<FakeGateway>,
}

pub async fn setup() -> anyhow::Result<TestApp> {
    setup_with(FakeGateway::new()).await
}

/// Fresh in-memory database, migrated, with `gateway` behind the state.
///
/// The pool holds a single connection, because every connection to
/// `sqlite::memory:` opens its own database. Concurrent tests on this setup
/// therefore run their transactions one after another; see
/// [`setup_postgres`] for a pool that really overlaps them.
pub async fn setup_with(gateway: FakeGateway) -> anyhow::Result<TestApp> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    setup_on(options, gateway).await
}

/// Migrated Postgres from `TEST_DATABASE_URL`, or `None` when it is unset.
pub async fn setup_postgres() -> anyhow::Result<Option<TestApp>> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("Skipping test: set TEST_DATABASE_URL to run it against Postgres.");
        return Ok(None);
    };
    let mut options = ConnectOptions::new(url);
    options.max_connections(16).sqlx_logging(false);
    Ok(Some(setup_on(options, FakeGateway::new()).await?))
}

async fn setup_on(options: ConnectOptions, gateway: FakeGateway) -> anyhow::Result<TestApp> {
    let orm = Database::connect(options).await?;
    run_migrations(&orm).await?;

    let gateway = Arc::new(gateway);
    let state = AppState {
        orm,
        payments: gateway.clone(),
        config: Arc::new(test_config()),
    };
    Ok(TestApp { state, gateway })
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".into(),
        host: "127.0.0.1".into(),
        port: 3000,
        jwt_secret: SecretString::from(JWT_SECRET.to_string()),
        public_base_url: "http://shop.test".into(),
        payments: PaymentConfig {
            backend: PaymentBackend::Fake,
            stripe_api_base: "https://api.stripe.com".into(),
            currency: "usd".into(),
            shipping_rate_ids: vec!["shr_standard".into()],
        },
    }
}

pub async fn create_user(
    state: &AppState,
    username: &str,
    password: &str,
    is_admin: bool,
) -> anyhow::Result<AuthUser> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        username: Set(username.to_string()),
        email: Set(format!("{username}@example.com")),
        password_hash: Set(hash_password(password)?),
        is_admin: Set(is_admin),
        shipping_address: Set(None),
        billing_address: Set(None),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser {
        user_id: user.id,
        is_admin,
    })
}

pub async fn shopper(state: &AppState) -> anyhow::Result<AuthUser> {
    create_user(state, "shopper", "user123", false).await
}

pub async fn admin(state: &AppState) -> anyhow::Result<AuthUser> {
    create_user(state, "admin", "admin123", true).await
}

pub fn item_request(name: &str, price: i64, stock: i32) -> CreateItemRequest {
    CreateItemRequest {
        name: name.to_string(),
        category: Category::Syrup,
        price,
        unit: Unit::Oz,
        unit_amount: 12.0,
        img_url: "https://images.example.com/item.jpg".into(),
        stock,
        description: format!("{name} for testing"),
    }
}

/// Create an item through the admin service so it carries live remote ids.
pub async fn create_item(
    state: &AppState,
    admin: &AuthUser,
    name: &str,
    price: i64,
    stock: i32,
) -> anyhow::Result<Item> {
    let resp = admin_service::create_item(state, admin, item_request(name, price, stock)).await?;
    resp.data
        .ok_or_else(|| anyhow::anyhow!("create_item returned no data"))
}
