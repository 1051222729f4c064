use axum::{extract::FromRequestParts, http::header};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use uuid::Uuid;

use crate::{dto::auth::Claims, error::AppError, state::AppState};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub is_admin: bool,
}

/// Capability check run at the top of every admin operation.
pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    if !user.is_admin {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// Profile operations act only on the caller's own record.
pub fn ensure_self(user: &AuthUser, target: Uuid) -> Result<(), AppError> {
    if user.user_id != target {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn issue_token(secret: &SecretString, user_id: Uuid, is_admin: bool) -> Result<String, AppError> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(24))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user_id.to_string(),
        admin: is_admin,
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub fn verify_token(secret: &SecretString, token: &str) -> Result<AuthUser, AppError> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.expose_secret().as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized)?;

    let user_id = Uuid::parse_str(&decoded.claims.sub).map_err(|_| AppError::Unauthorized)?;

    Ok(AuthUser {
        user_id,
        is_admin: decoded.claims.admin,
    })
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_str = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        let token = auth_str
            .strip_prefix("Bearer ")
            .map(str::trim)
            .ok_or(AppError::Unauthorized)?;

        verify_token(&state.config.jwt_secret, token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_round_trips_identity() {
        let secret = SecretString::from("test-secret".to_string());
        let user_id = Uuid::new_v4();
        let token = issue_token(&secret, user_id, true).expect("token");
        let user = verify_token(&secret, &token).expect("verified");
        assert_eq!(user.user_id, user_id);
        assert!(user.is_admin);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let secret = SecretString::from("test-secret".to_string());
        let other = SecretString::from("other-secret".to_string());
        let token = issue_token(&other, Uuid::new_v4(), false).expect("token");
        assert!(matches!(
            verify_token(&secret, &token),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn admin_gate_rejects_regular_users() {
        let user = AuthUser {
            user_id: Uuid::new_v4(),
            is_admin: false,
        };
        assert!(matches!(ensure_admin(&user), Err(AppError::Forbidden)));
        assert!(ensure_self(&user, user.user_id).is_ok());
        assert!(matches!(
            ensure_self(&user, Uuid::new_v4()),
            Err(AppError::Forbidden)
        ));
    }
}
