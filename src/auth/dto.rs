use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::users::dto::PublicUser;

/// Request body for login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "must be a valid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub password: String,
}

/// Returned after a successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: u64, // seconds
    pub user: PublicUser,
}
