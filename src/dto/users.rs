use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct EditProfileRequest {
    #[validate(length(min = 1, max = 250))]
    pub username: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub shipping_address: Option<String>,
    pub billing_address: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1))]
    pub password: String,
    #[validate(must_match(other = "password", message = "passwords do not match"))]
    pub verify_pass: String,
}
