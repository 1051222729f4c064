//! In-process checkout collaborator used by tests and by local runs without a
//! Stripe key.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Mutex;

use super::{
    CheckoutLine, CheckoutSessionRequest, PaymentError, PaymentGateway, PaymentStatus,
    ProductDetails, ProductUpdate, RemoteCheckoutSession, RemotePrice, RemoteProduct,
};

#[derive(Debug, Clone)]
pub struct FakeProduct {
    pub details: ProductDetails,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct FakeSession {
    pub session: RemoteCheckoutSession,
    pub lines: Vec<CheckoutLine>,
    pub client_reference_id: String,
}

#[derive(Default)]
pub struct FakeGateway {
    pub products: Mutex<HashMap<String, FakeProduct>>,
    pub prices: Mutex<HashMap<String, RemotePrice>>,
    pub sessions: Mutex<HashMap<String, FakeSession>>,
    pub checkout_calls: AtomicU64,
    pub fail_checkout: AtomicBool,
    pub fail_price_creation: AtomicBool,
    pub fail_price_deactivation: AtomicBool,
    /// Sessions are created already paid and their URL points at the success callback.
    pub auto_settle: bool,
    next_id: AtomicU64,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn auto_settling() -> Self {
        Self {
            auto_settle: true,
            ..Self::default()
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{prefix}_fake_{n}")
    }

    pub fn checkout_call_count(&self) -> u64 {
        self.checkout_calls.load(Ordering::Relaxed)
    }

    pub async fn price(&self, price_id: &str) -> Option<RemotePrice> {
        self.prices.lock().await.get(price_id).cloned()
    }

    pub async fn product(&self, product_id: &str) -> Option<FakeProduct> {
        self.products.lock().await.get(product_id).cloned()
    }

    pub async fn prices_for_product(&self, product_id: &str) -> Vec<RemotePrice> {
        let mut prices: Vec<RemotePrice> = self
            .prices
            .lock()
            .await
            .values()
            .filter(|price| price.product_id == product_id)
            .cloned()
            .collect();
        prices.sort_by(|a, b| a.id.cmp(&b.id));
        prices
    }

    pub async fn session(&self, session_id: &str) -> Option<FakeSession> {
        self.sessions.lock().await.get(session_id).cloned()
    }

    /// Simulate the customer completing payment on the hosted page.
    pub async fn mark_paid(&self, session_id: &str) -> Result<(), PaymentError> {
        let mut sessions = self.sessions.lock().await;
        let entry = sessions
            .get_mut(session_id)
            .ok_or_else(|| PaymentError::UnknownObject(session_id.to_string()))?;
        entry.session.payment_status = PaymentStatus::Paid;
        Ok(())
    }
}

fn rejected(message: &str) -> PaymentError {
    PaymentError::Api {
        status: 400,
        message: message.to_string(),
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    fn backend_tag(&self) -> &'static str {
        "fake"
    }

    async fn create_product(&self, details: &ProductDetails) -> Result<RemoteProduct, PaymentError> {
        let id = self.next_id("prod");
        self.products.lock().await.insert(
            id.clone(),
            FakeProduct {
                details: details.clone(),
                active: true,
            },
        );
        Ok(RemoteProduct { id, active: true })
    }

    async fn update_product(
        &self,
        product_id: &str,
        update: &ProductUpdate,
    ) -> Result<RemoteProduct, PaymentError> {
        let mut products = self.products.lock().await;
        let product = products
            .get_mut(product_id)
            .ok_or_else(|| PaymentError::UnknownObject(product_id.to_string()))?;
        if let Some(details) = &update.details {
            product.details = details.clone();
        }
        if let Some(active) = update.active {
            product.active = active;
        }
        Ok(RemoteProduct {
            id: product_id.to_string(),
            active: product.active,
        })
    }

    async fn create_price(
        &self,
        product_id: &str,
        unit_amount: i64,
    ) -> Result<RemotePrice, PaymentError> {
        if self.fail_price_creation.load(Ordering::Relaxed) {
            return Err(rejected("price creation rejected"));
        }
        if !self.products.lock().await.contains_key(product_id) {
            return Err(PaymentError::UnknownObject(product_id.to_string()));
        }
        let price = RemotePrice {
            id: self.next_id("price"),
            product_id: product_id.to_string(),
            unit_amount,
            active: true,
        };
        self.prices
            .lock()
            .await
            .insert(price.id.clone(), price.clone());
        Ok(price)
    }

    async fn deactivate_price(&self, price_id: &str) -> Result<RemotePrice, PaymentError> {
        if self.fail_price_deactivation.load(Ordering::Relaxed) {
            return Err(rejected("price update rejected"));
        }
        let mut prices = self.prices.lock().await;
        let price = prices
            .get_mut(price_id)
            .ok_or_else(|| PaymentError::UnknownObject(price_id.to_string()))?;
        price.active = false;
        Ok(price.clone())
    }

    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<RemoteCheckoutSession, PaymentError> {
        self.checkout_calls.fetch_add(1, Ordering::Relaxed);
        if self.fail_checkout.load(Ordering::Relaxed) {
            return Err(rejected("checkout session rejected"));
        }
        {
            let prices = self.prices.lock().await;
            for line in &request.lines {
                match prices.get(&line.price_id) {
                    Some(price) if price.active => {}
                    _ => return Err(rejected("No such price")),
                }
            }
        }

        let id = self.next_id("cs");
        let (url, payment_status) = if self.auto_settle {
            (
                request.success_url.replace("{CHECKOUT_SESSION_ID}", &id),
                PaymentStatus::Paid,
            )
        } else {
            (format!("https://checkout.fake.local/pay/{id}"), PaymentStatus::Unpaid)
        };
        let session = RemoteCheckoutSession {
            id: id.clone(),
            url: Some(url),
            payment_status,
        };
        self.sessions.lock().await.insert(
            id,
            FakeSession {
                session: session.clone(),
                lines: request.lines.clone(),
                client_reference_id: request.client_reference_id.clone(),
            },
        );
        Ok(session)
    }

    async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<RemoteCheckoutSession, PaymentError> {
        self.sessions
            .lock()
            .await
            .get(session_id)
            .map(|entry| entry.session.clone())
            .ok_or_else(|| PaymentError::UnknownObject(session_id.to_string()))
    }
}
