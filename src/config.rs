use std::env;

use secrecy::SecretString;

#[derive(Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: SecretString,
    pub public_base_url: String,
    pub payments: PaymentConfig,
}

/// Which checkout provider the server talks to.
#[derive(Debug)]
pub enum PaymentBackend {
    Stripe(SecretString),
    /// In-process gateway whose sessions settle immediately. Opt-in only.
    Fake,
}

#[derive(Debug)]
pub struct PaymentConfig {
    pub backend: PaymentBackend,
    pub stripe_api_base: String,
    pub currency: String,
    pub shipping_rate_ids: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET is not set"))?;
        let public_base_url = env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://{host}:{port}"));

        let backend = payment_backend(
            env::var("PAYMENTS_BACKEND").ok().as_deref(),
            env::var("STRIPE_SECRET_KEY").ok().filter(|key| !key.is_empty()),
        )?;

        let payments = PaymentConfig {
            backend,
            stripe_api_base: env::var("STRIPE_API_BASE")
                .unwrap_or_else(|_| "https://api.stripe.com".to_string()),
            currency: env::var("CHECKOUT_CURRENCY").unwrap_or_else(|_| "usd".to_string()),
            shipping_rate_ids: parse_list(env::var("SHIPPING_RATE_IDS").ok().as_deref()),
        };

        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret: SecretString::from(jwt_secret),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            payments,
        })
    }
}

fn payment_backend(
    selected: Option<&str>,
    stripe_secret_key: Option<String>,
) -> anyhow::Result<PaymentBackend> {
    match selected.map(str::trim).filter(|s| !s.is_empty()) {
        None | Some("stripe") => stripe_secret_key
            .map(|key| PaymentBackend::Stripe(SecretString::from(key)))
            .ok_or_else(|| {
                anyhow::anyhow!("STRIPE_SECRET_KEY is not set (use PAYMENTS_BACKEND=fake for local runs)")
            }),
        Some("fake") => Ok(PaymentBackend::Fake),
        Some(other) => anyhow::bail!("unknown PAYMENTS_BACKEND: {other}"),
    }
}

fn parse_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::{PaymentBackend, parse_list, payment_backend};

    #[test]
    fn shipping_rates_split_on_commas_and_skip_blanks() {
        assert_eq!(
            parse_list(Some("shr_standard, shr_express,,")),
            vec!["shr_standard".to_string(), "shr_express".to_string()]
        );
        assert!(parse_list(None).is_empty());
        assert!(parse_list(Some("  ")).is_empty());
    }

    #[test]
    fn stripe_is_the_default_and_needs_a_key() {
        assert!(matches!(
            payment_backend(None, Some("sk_test_1".into())),
            Ok(PaymentBackend::Stripe(_))
        ));
        assert!(payment_backend(None, None).is_err());
        assert!(payment_backend(Some("stripe"), None).is_err());
    }

    #[test]
    fn fake_backend_must_be_named() {
        assert!(matches!(
            payment_backend(Some("fake"), None),
            Ok(PaymentBackend::Fake)
        ));
        assert!(payment_backend(Some("paypal"), Some("sk_test_1".into())).is_err());
    }
}
