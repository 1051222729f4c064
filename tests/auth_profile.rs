mod common;

use condiment_shop::{
    dto::{
        auth::{LoginRequest, SignUpRequest},
        users::{ChangePasswordRequest, EditProfileRequest},
    },
    error::AppError,
    middleware::auth::verify_token,
    services::{auth_service, profile_service},
};

fn sign_up(username: &str, email: &str) -> SignUpRequest {
    SignUpRequest {
        username: username.into(),
        email: email.into(),
        password: "hunter22".into(),
    }
}

#[tokio::test]
async fn sign_up_then_login_issues_token() -> anyhow::Result<()> {
    let app = common::setup().await?;
    let user = auth_service::register_user(&app.state, sign_up("jane", "jane@example.com"))
        .await?
        .data
        .expect("user");
    assert!(!user.is_admin);

    let login = auth_service::login_user(
        &app.state,
        LoginRequest {
            email: "jane@example.com".into(),
            password: "hunter22".into(),
        },
    )
    .await?
    .data
    .expect("token");

    let token = login.token.strip_prefix("Bearer ").expect("bearer prefix");
    let auth = verify_token(&app.state.config.jwt_secret, token)?;
    assert_eq!(auth.user_id, user.id);
    assert!(!auth.is_admin);
    Ok(())
}

#[tokio::test]
async fn duplicate_email_or_username_is_rejected() -> anyhow::Result<()> {
    let app = common::setup().await?;
    auth_service::register_user(&app.state, sign_up("jane", "jane@example.com")).await?;

    let same_email =
        auth_service::register_user(&app.state, sign_up("janet", "jane@example.com")).await;
    match same_email {
        Err(AppError::BadRequest(msg)) => assert!(msg.contains("/api/login")),
        other => panic!("expected duplicate email rejection, got {other:?}"),
    }

    let same_username =
        auth_service::register_user(&app.state, sign_up("jane", "other@example.com")).await;
    assert!(matches!(same_username, Err(AppError::BadRequest(_))));
    Ok(())
}

#[tokio::test]
async fn wrong_password_is_rejected() -> anyhow::Result<()> {
    let app = common::setup().await?;
    auth_service::register_user(&app.state, sign_up("jane", "jane@example.com")).await?;

    let result = auth_service::login_user(
        &app.state,
        LoginRequest {
            email: "jane@example.com".into(),
            password: "wrong".into(),
        },
    )
    .await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));
    Ok(())
}

#[tokio::test]
async fn profile_edits_are_limited_to_self() -> anyhow::Result<()> {
    let app = common::setup().await?;
    let alice = common::create_user(&app.state, "alice", "pw", false).await?;
    let bob = common::create_user(&app.state, "bob", "pw", false).await?;

    let updated = profile_service::edit_profile(
        &app.state,
        &alice,
        alice.user_id,
        EditProfileRequest {
            username: None,
            email: None,
            shipping_address: Some("1 Maple Way".into()),
            billing_address: Some("  ".into()),
        },
    )
    .await?
    .data
    .expect("user");
    assert_eq!(updated.shipping_address.as_deref(), Some("1 Maple Way"));
    assert_eq!(updated.billing_address, None);

    let taken = profile_service::edit_profile(
        &app.state,
        &alice,
        alice.user_id,
        EditProfileRequest {
            username: Some("bob".into()),
            email: None,
            shipping_address: None,
            billing_address: None,
        },
    )
    .await;
    assert!(matches!(taken, Err(AppError::BadRequest(_))));

    let other = profile_service::edit_profile(
        &app.state,
        &bob,
        alice.user_id,
        EditProfileRequest {
            username: Some("mallory".into()),
            email: None,
            shipping_address: None,
            billing_address: None,
        },
    )
    .await;
    assert!(matches!(other, Err(AppError::Forbidden)));
    Ok(())
}

#[tokio::test]
async fn password_change_requires_matching_confirmation() -> anyhow::Result<()> {
    let app = common::setup().await?;
    let user = common::create_user(&app.state, "carol", "old-password", false).await?;

    let mismatch = profile_service::change_password(
        &app.state,
        &user,
        user.user_id,
        ChangePasswordRequest {
            password: "new-password".into(),
            verify_pass: "typo".into(),
        },
    )
    .await;
    assert!(matches!(mismatch, Err(AppError::Validation(_))));

    profile_service::change_password(
        &app.state,
        &user,
        user.user_id,
        ChangePasswordRequest {
            password: "new-password".into(),
            verify_pass: "new-password".into(),
        },
    )
    .await?;

    let login = auth_service::login_user(
        &app.state,
        LoginRequest {
            email: "carol@example.com".into(),
            password: "new-password".into(),
        },
    )
    .await;
    assert!(login.is_ok());
    Ok(())
}
