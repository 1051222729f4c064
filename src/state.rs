use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{config::AppConfig, payments::PaymentGateway};

#[derive(Clone)]
pub struct AppState {
    pub orm: DatabaseConnection,
    pub payments: Arc<dyn PaymentGateway>,
    pub config: Arc<AppConfig>,
}
