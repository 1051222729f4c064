use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub use crate::entity::items::{Category, Unit};

use crate::entity::{items, line_items, orders, users};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    pub shipping_address: Option<String>,
    pub billing_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Item {
    pub id: Uuid,
    pub name: String,
    pub category: Category,
    /// Price in cents.
    pub price: i64,
    pub unit: Unit,
    pub unit_amount: f64,
    pub stock: i32,
    pub img_url: String,
    pub description: String,
    pub remote_product_id: String,
    pub remote_price_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_amount: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderLine {
    pub id: Uuid,
    /// `None` when the item has since been removed from the catalog.
    pub item_id: Option<Uuid>,
    pub quantity: i32,
    pub unit_price: i64,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        User {
            id: model.id,
            username: model.username,
            email: model.email,
            is_admin: model.is_admin,
            shipping_address: model.shipping_address,
            billing_address: model.billing_address,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<items::Model> for Item {
    fn from(model: items::Model) -> Self {
        Item {
            id: model.id,
            name: model.name,
            category: model.category,
            price: model.price,
            unit: model.unit,
            unit_amount: model.unit_amount,
            stock: model.stock,
            img_url: model.img_url,
            description: model.description,
            remote_product_id: model.remote_product_id,
            remote_price_id: model.remote_price_id,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<orders::Model> for Order {
    fn from(model: orders::Model) -> Self {
        Order {
            id: model.id,
            user_id: model.user_id,
            total_amount: model.total_amount,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<line_items::Model> for OrderLine {
    fn from(model: line_items::Model) -> Self {
        OrderLine {
            id: model.id,
            item_id: model.item_id,
            quantity: model.quantity,
            unit_price: model.unit_price.unwrap_or_default(),
        }
    }
}
