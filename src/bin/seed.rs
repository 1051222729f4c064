use std::sync::Arc;

use chrono::Utc;
use condiment_shop::{
    config::{AppConfig, PaymentBackend},
    db::{create_orm_conn, run_migrations},
    dto::items::CreateItemRequest,
    entity::users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    error::AppError,
    middleware::auth::AuthUser,
    models::{Category, Unit},
    payments::{FakeGateway, PaymentGateway, StripeGateway},
    services::{admin_service, auth_service::hash_password},
    state::AppState,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = AppConfig::from_env()?;
    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    let admin_id = ensure_user(&orm, "admin", "admin@example.com", "admin123", true).await?;
    let user_id = ensure_user(&orm, "shopper", "user@example.com", "user123", false).await?;

    let payments: Arc<dyn PaymentGateway> = match &config.payments.backend {
        PaymentBackend::Stripe(key) => Arc::new(StripeGateway::new(
            key,
            &config.payments.stripe_api_base,
            &config.payments.currency,
        )?),
        PaymentBackend::Fake => Arc::new(FakeGateway::new()),
    };
    let state = AppState {
        orm,
        payments,
        config: Arc::new(config),
    };
    let admin = AuthUser {
        user_id: admin_id,
        is_admin: true,
    };
    seed_items(&state, &admin).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    orm: &DatabaseConnection,
    username: &str,
    email: &str,
    password: &str,
    is_admin: bool,
) -> anyhow::Result<Uuid> {
    if let Some(existing) = Users::find()
        .filter(UserCol::Email.eq(email))
        .one(orm)
        .await?
    {
        println!("User {email} already present");
        return Ok(existing.id);
    }

    let user = UserActive {
        id: Set(Uuid::new_v4()),
        username: Set(username.to_string()),
        email: Set(email.to_string()),
        password_hash: Set(hash_password(password)?),
        is_admin: Set(is_admin),
        shipping_address: Set(None),
        billing_address: Set(None),
        created_at: Set(Utc::now().into()),
    }
    .insert(orm)
    .await?;

    println!("Ensured user {email} (admin={is_admin})");
    Ok(user.id)
}

async fn seed_items(state: &AppState, admin: &AuthUser) -> anyhow::Result<()> {
    let items = vec![
        ("Vermont Maple Syrup", Category::Syrup, 1499, Unit::Oz, 12.0, "Grade A dark, boiled over wood fire"),
        ("Blueberry Syrup", Category::Syrup, 1099, Unit::Ml, 250.0, "Wild Maine blueberries"),
        ("Habanero Gold", Category::HotSauce, 899, Unit::Oz, 5.0, "Mango and habanero, bright heat"),
        ("Smoked Chipotle", Category::HotSauce, 799, Unit::Oz, 5.0, "Slow smoked jalapenos and garlic"),
        ("Strawberry Rhubarb Jam", Category::Jam, 999, Unit::G, 340.0, "Small batch, low sugar"),
        ("Fig and Black Pepper Jam", Category::Jam, 1199, Unit::G, 340.0, "For cheese boards"),
    ];

    for (name, category, price, unit, unit_amount, description) in items {
        let payload = CreateItemRequest {
            name: name.to_string(),
            category,
            price,
            unit,
            unit_amount,
            img_url: format!(
                "https://images.example.com/{}.jpg",
                name.to_lowercase().replace(' ', "-")
            ),
            stock: 25,
            description: description.to_string(),
        };
        match admin_service::create_item(state, admin, payload).await {
            Ok(_) => println!("Seeded {name}"),
            Err(AppError::BadRequest(_)) => println!("{name} already present"),
            Err(err) => return Err(anyhow::anyhow!(err.to_string())),
        }
    }

    Ok(())
}
