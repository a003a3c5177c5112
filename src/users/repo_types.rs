use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// User document in the `users` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", with = "crate::db::uuid_as_binary")]
    pub id: Uuid,
    pub email: String,
    pub password: String, // argon2 PHC string, never plaintext
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Fields needed to insert a user; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub image: Option<String>,
}

/// Partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub image: Option<String>,
}

impl User {
    /// Builds the stored document, assigning its identifier.
    pub fn from_new(input: NewUser) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            email: input.email,
            password: input.password_hash,
            first_name: input.first_name,
            last_name: input.last_name,
            phone_number: input.phone_number,
            image: input.image,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// In-memory equivalent of the repository's `$set`.
    #[cfg(test)]
    pub fn apply(&mut self, changes: UserChanges) {
        if let Some(email) = changes.email {
            self.email = email;
        }
        if let Some(first_name) = changes.first_name {
            self.first_name = first_name;
        }
        if let Some(last_name) = changes.last_name {
            self.last_name = last_name;
        }
        if let Some(phone_number) = changes.phone_number {
            self.phone_number = Some(phone_number);
        }
        if let Some(image) = changes.image {
            self.image = Some(image);
        }
        self.updated_at = OffsetDateTime::now_utc();
    }
}
