use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit,
    dto::users::{ChangePasswordRequest, EditProfileRequest},
    entity::users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_self},
    models::User,
    response::{ApiResponse, Meta},
    services::auth_service::hash_password,
    state::AppState,
};

pub async fn get_profile(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<User>> {
    let existing = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Profile", existing.into(), None))
}

pub async fn edit_profile(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: EditProfileRequest,
) -> AppResult<ApiResponse<User>> {
    ensure_self(user, id)?;
    payload.validate()?;

    let existing = Users::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if let Some(email) = payload.email.as_ref().filter(|e| **e != existing.email) {
        let taken = Users::find()
            .filter(UserCol::Email.eq(email.as_str()))
            .one(&state.orm)
            .await?
            .is_some();
        if taken {
            return Err(AppError::BadRequest("Email is already registered".into()));
        }
    }
    if let Some(username) = payload.username.as_ref().filter(|u| **u != existing.username) {
        let taken = Users::find()
            .filter(UserCol::Username.eq(username.as_str()))
            .one(&state.orm)
            .await?
            .is_some();
        if taken {
            return Err(AppError::BadRequest("Username is already taken".into()));
        }
    }

    let mut active: UserActive = existing.into();
    if let Some(username) = payload.username {
        active.username = Set(username);
    }
    if let Some(email) = payload.email {
        active.email = Set(email);
    }
    if let Some(shipping) = payload.shipping_address {
        active.shipping_address = Set(Some(shipping).filter(|s| !s.trim().is_empty()));
    }
    if let Some(billing) = payload.billing_address {
        active.billing_address = Set(Some(billing).filter(|s| !s.trim().is_empty()));
    }
    let updated = active.update(&state.orm).await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "profile_update",
        "users",
        serde_json::json!({ "user_id": updated.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Profile updated",
        updated.into(),
        Some(Meta::empty()),
    ))
}

pub async fn change_password(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: ChangePasswordRequest,
) -> AppResult<ApiResponse<User>> {
    ensure_self(user, id)?;
    payload.validate()?;

    let existing = Users::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: UserActive = existing.into();
    active.password_hash = Set(hash_password(&payload.password)?);
    let updated = active.update(&state.orm).await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "password_change",
        "users",
        serde_json::json!({ "user_id": updated.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Password changed",
        updated.into(),
        Some(Meta::empty()),
    ))
}
