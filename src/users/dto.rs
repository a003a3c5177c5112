use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

use super::repo_types::{User, UserChanges};

/// Request body for registration.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(email(message = "must be a valid email"))]
    pub email: String,
    #[validate(length(min = 9, max = 32, message = "must be between 9 and 32 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub last_name: String,
    #[validate(length(min = 11, max = 14, message = "must be between 11 and 14 characters"))]
    pub phone_number: Option<String>,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub image: Option<String>,
}

/// Request body for `PUT /users`; every field is optional.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(email(message = "must be a valid email"))]
    pub email: Option<String>,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub last_name: Option<String>,
    #[validate(length(min = 11, max = 14, message = "must be between 11 and 14 characters"))]
    pub phone_number: Option<String>,
}

impl From<UpdateUserRequest> for UserChanges {
    fn from(r: UpdateUserRequest) -> Self {
        Self {
            email: r.email,
            first_name: r.first_name,
            last_name: r.last_name,
            phone_number: r.phone_number,
            image: None,
        }
    }
}

/// Public part of the user returned to the client; never carries the hash.
#[derive(Debug, Serialize, Deserialize)]
pub struct PublicUser {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub image: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            first_name: u.first_name,
            last_name: u.last_name,
            phone_number: u.phone_number,
            image: u.image,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}
