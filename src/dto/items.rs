use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::{Category, Item, Unit};

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateItemRequest {
    #[validate(length(min = 1, max = 250))]
    pub name: String,
    pub category: Category,
    /// USD price in cents.
    #[validate(range(min = 1))]
    pub price: i64,
    pub unit: Unit,
    #[validate(range(exclusive_min = 0.0))]
    pub unit_amount: f64,
    #[validate(url)]
    pub img_url: String,
    #[validate(range(min = 0))]
    pub stock: i32,
    #[validate(length(min = 1))]
    pub description: String,
}

#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct UpdateItemRequest {
    #[validate(length(min = 1, max = 250))]
    pub name: Option<String>,
    pub category: Option<Category>,
    #[validate(range(min = 1))]
    pub price: Option<i64>,
    pub unit: Option<Unit>,
    #[validate(range(exclusive_min = 0.0))]
    pub unit_amount: Option<f64>,
    #[validate(url)]
    pub img_url: Option<String>,
    #[validate(range(min = 0))]
    pub stock: Option<i32>,
    #[validate(length(min = 1))]
    pub description: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ItemList {
    #[schema(value_type = Vec<Item>)]
    pub items: Vec<Item>,
}
