//! Checkout collaborator: the hosted payment provider that owns remote
//! product/price objects and hosted checkout sessions.
//!
//! Remote prices are immutable. Changing what an item costs means creating a
//! new price and deactivating the old one.

use async_trait::async_trait;
use thiserror::Error;

pub mod fake;
pub mod stripe;

pub use fake::FakeGateway;
pub use stripe::StripeGateway;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("unknown remote object: {0}")]
    UnknownObject(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Fields the provider stores for a product.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDetails {
    pub name: String,
    pub description: String,
    pub image_url: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductUpdate {
    pub details: Option<ProductDetails>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteProduct {
    pub id: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemotePrice {
    pub id: String,
    pub product_id: String,
    pub unit_amount: i64,
    pub active: bool,
}

/// One entry of a checkout manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutLine {
    pub price_id: String,
    pub quantity: i64,
}

#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest {
    pub lines: Vec<CheckoutLine>,
    pub shipping_rate_ids: Vec<String>,
    pub success_url: String,
    pub cancel_url: String,
    /// Opaque reference echoed back by the provider.
    pub client_reference_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Paid,
    Unpaid,
    NoPaymentRequired,
}

impl PaymentStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "paid" => PaymentStatus::Paid,
            "no_payment_required" => PaymentStatus::NoPaymentRequired,
            _ => PaymentStatus::Unpaid,
        }
    }

    pub fn is_settled(self) -> bool {
        matches!(self, PaymentStatus::Paid | PaymentStatus::NoPaymentRequired)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCheckoutSession {
    pub id: String,
    pub url: Option<String>,
    pub payment_status: PaymentStatus,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    async fn create_product(&self, details: &ProductDetails) -> Result<RemoteProduct, PaymentError>;

    async fn update_product(
        &self,
        product_id: &str,
        update: &ProductUpdate,
    ) -> Result<RemoteProduct, PaymentError>;

    /// `unit_amount` is in minor currency units.
    async fn create_price(
        &self,
        product_id: &str,
        unit_amount: i64,
    ) -> Result<RemotePrice, PaymentError>;

    async fn deactivate_price(&self, price_id: &str) -> Result<RemotePrice, PaymentError>;

    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<RemoteCheckoutSession, PaymentError>;

    async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<RemoteCheckoutSession, PaymentError>;

    async fn deactivate_product(&self, product_id: &str) -> Result<RemoteProduct, PaymentError> {
        self.update_product(
            product_id,
            &ProductUpdate {
                details: None,
                active: Some(false),
            },
        )
        .await
    }
}
