//! Stripe REST client for the checkout collaborator.
//!
//! Stripe takes `application/x-www-form-urlencoded` bodies with bracketed keys
//! for nested fields (`line_items[0][price]`) and answers with JSON.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::{
    CheckoutSessionRequest, PaymentError, PaymentGateway, PaymentStatus, ProductDetails,
    ProductUpdate, RemoteCheckoutSession, RemotePrice, RemoteProduct,
};

type Form = Vec<(String, String)>;

#[derive(Clone)]
pub struct StripeGateway {
    client: reqwest::Client,
    api_base: String,
    currency: String,
}

impl StripeGateway {
    pub fn new(
        secret_key: &SecretString,
        api_base: &str,
        currency: &str,
    ) -> Result<Self, PaymentError> {
        let mut headers = HeaderMap::new();
        let auth_value = format!("Bearer {}", secret_key.expose_secret());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_value)
                .map_err(|e| PaymentError::Parse(format!("Invalid API key format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(20))
            .build()?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            currency: currency.to_lowercase(),
        })
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, form: &Form) -> Result<T, PaymentError> {
        let url = format!("{}{path}", self.api_base);
        let response = self.client.post(&url).form(form).send().await?;
        Self::decode(response).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, PaymentError> {
        let url = format!("{}{path}", self.api_base);
        let response = self.client.get(&url).send().await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, PaymentError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<StripeErrorBody>(&body)
                .map(|parsed| parsed.error.message)
                .unwrap_or(body);
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|e| PaymentError::Parse(e.to_string()))
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    fn backend_tag(&self) -> &'static str {
        "stripe"
    }

    async fn create_product(&self, details: &ProductDetails) -> Result<RemoteProduct, PaymentError> {
        let product: StripeProduct = self.post("/v1/products", &product_form(details)).await?;
        Ok(product.into())
    }

    async fn update_product(
        &self,
        product_id: &str,
        update: &ProductUpdate,
    ) -> Result<RemoteProduct, PaymentError> {
        let path = format!("/v1/products/{product_id}");
        let product: StripeProduct = self.post(&path, &product_update_form(update)).await?;
        Ok(product.into())
    }

    async fn create_price(
        &self,
        product_id: &str,
        unit_amount: i64,
    ) -> Result<RemotePrice, PaymentError> {
        let form = price_form(product_id, unit_amount, &self.currency);
        let price: StripePrice = self.post("/v1/prices", &form).await?;
        Ok(price.into())
    }

    async fn deactivate_price(&self, price_id: &str) -> Result<RemotePrice, PaymentError> {
        let path = format!("/v1/prices/{price_id}");
        let form = vec![("active".to_string(), "false".to_string())];
        let price: StripePrice = self.post(&path, &form).await?;
        Ok(price.into())
    }

    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<RemoteCheckoutSession, PaymentError> {
        let session: StripeCheckoutSession = self
            .post("/v1/checkout/sessions", &checkout_form(request))
            .await?;
        Ok(session.into())
    }

    async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<RemoteCheckoutSession, PaymentError> {
        let path = format!("/v1/checkout/sessions/{session_id}");
        let session: StripeCheckoutSession = self.get(&path).await?;
        Ok(session.into())
    }
}

fn product_form(details: &ProductDetails) -> Form {
    vec![
        ("name".to_string(), details.name.clone()),
        ("description".to_string(), details.description.clone()),
        ("images[0]".to_string(), details.image_url.clone()),
    ]
}

fn product_update_form(update: &ProductUpdate) -> Form {
    let mut form = update.details.as_ref().map(product_form).unwrap_or_default();
    if let Some(active) = update.active {
        form.push(("active".to_string(), active.to_string()));
    }
    form
}

fn price_form(product_id: &str, unit_amount: i64, currency: &str) -> Form {
    vec![
        ("product".to_string(), product_id.to_string()),
        ("unit_amount".to_string(), unit_amount.to_string()),
        ("currency".to_string(), currency.to_string()),
    ]
}

fn checkout_form(request: &CheckoutSessionRequest) -> Form {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
        (
            "client_reference_id".to_string(),
            request.client_reference_id.clone(),
        ),
        (
            "shipping_address_collection[allowed_countries][0]".to_string(),
            "US".to_string(),
        ),
    ];
    for (idx, line) in request.lines.iter().enumerate() {
        form.push((format!("line_items[{idx}][price]"), line.price_id.clone()));
        form.push((format!("line_items[{idx}][quantity]"), line.quantity.to_string()));
    }
    for (idx, rate) in request.shipping_rate_ids.iter().enumerate() {
        form.push((format!("shipping_options[{idx}][shipping_rate]"), rate.clone()));
    }
    form
}

#[derive(Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Deserialize)]
struct StripeErrorDetail {
    message: String,
}

#[derive(Deserialize)]
struct StripeProduct {
    id: String,
    active: bool,
}

impl From<StripeProduct> for RemoteProduct {
    fn from(product: StripeProduct) -> Self {
        RemoteProduct {
            id: product.id,
            active: product.active,
        }
    }
}

#[derive(Deserialize)]
struct StripePrice {
    id: String,
    product: String,
    unit_amount: Option<i64>,
    active: bool,
}

impl From<StripePrice> for RemotePrice {
    fn from(price: StripePrice) -> Self {
        RemotePrice {
            id: price.id,
            product_id: price.product,
            unit_amount: price.unit_amount.unwrap_or_default(),
            active: price.active,
        }
    }
}

#[derive(Deserialize)]
struct StripeCheckoutSession {
    id: String,
    url: Option<String>,
    payment_status: String,
}

impl From<StripeCheckoutSession> for RemoteCheckoutSession {
    fn from(session: StripeCheckoutSession) -> Self {
        RemoteCheckoutSession {
            id: session.id,
            url: session.url,
            payment_status: PaymentStatus::parse(&session.payment_status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::CheckoutLine;

    fn value<'a>(form: &'a Form, key: &str) -> Option<&'a str> {
        form.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn checkout_form_indexes_lines_and_shipping_rates() {
        let request = CheckoutSessionRequest {
            lines: vec![
                CheckoutLine {
                    price_id: "price_a".into(),
                    quantity: 2,
                },
                CheckoutLine {
                    price_id: "price_b".into(),
                    quantity: 1,
                },
            ],
            shipping_rate_ids: vec!["shr_1".into()],
            success_url: "https://shop.test/api/success?session_id={CHECKOUT_SESSION_ID}".into(),
            cancel_url: "https://shop.test/api/cancel".into(),
            client_reference_id: "user-1".into(),
        };

        let form = checkout_form(&request);
        assert_eq!(value(&form, "mode"), Some("payment"));
        assert_eq!(value(&form, "line_items[0][price]"), Some("price_a"));
        assert_eq!(value(&form, "line_items[0][quantity]"), Some("2"));
        assert_eq!(value(&form, "line_items[1][price]"), Some("price_b"));
        assert_eq!(value(&form, "shipping_options[0][shipping_rate]"), Some("shr_1"));
        assert_eq!(value(&form, "client_reference_id"), Some("user-1"));
    }

    #[test]
    fn deactivation_only_sends_active_flag() {
        let form = product_update_form(&ProductUpdate {
            details: None,
            active: Some(false),
        });
        assert_eq!(form, vec![("active".to_string(), "false".to_string())]);
    }

    #[test]
    fn price_form_carries_minor_units() {
        let form = price_form("prod_1", 1299, "usd");
        assert_eq!(value(&form, "unit_amount"), Some("1299"));
        assert_eq!(value(&form, "currency"), Some("usd"));
    }
}
