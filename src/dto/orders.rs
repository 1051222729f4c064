use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{Order, OrderLine};

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderLine>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutRedirect {
    pub session_id: String,
    pub url: String,
}
