use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{CreateUserRequest, UpdateUserRequest},
    repo::UserRepository,
    repo_types::{NewUser, User, UserChanges},
};
use crate::{
    auth::password::hash_password_blocking,
    errors::{AppError, AppResult},
};

const USER_MISSING: &str = "User doesn't exist";

#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }

    /// Registers a user. The returned record still carries the password hash;
    /// callers must project it through `PublicUser` before responding.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn create_user(&self, input: CreateUserRequest) -> AppResult<User> {
        if self.repo.find_by_email(&input.email).await?.is_some() {
            warn!("email already registered");
            return Err(AppError::Conflict(format!(
                "This email {} already exists",
                input.email
            )));
        }

        let password_hash = hash_password_blocking(input.password).await?;
        let user = self
            .repo
            .create(NewUser {
                email: input.email,
                password_hash,
                first_name: input.first_name,
                last_name: input.last_name,
                phone_number: input.phone_number,
                image: input.image,
            })
            .await?;

        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Partial update; the email may not belong to any other user.
    #[instrument(skip(self, input))]
    pub async fn update_user(&self, id: Uuid, input: UpdateUserRequest) -> AppResult<User> {
        if let Some(email) = &input.email {
            if let Some(owner) = self.repo.find_by_email(email).await? {
                if owner.id != id {
                    warn!(%email, "email owned by another user");
                    return Err(AppError::Conflict(format!("This email {email} already exists")));
                }
            }
        }

        self.repo
            .update(id, input.into())
            .await?
            .ok_or_else(|| AppError::NotFound(USER_MISSING.into()))
    }

    #[instrument(skip(self))]
    pub async fn update_user_image(&self, id: Uuid, url: String) -> AppResult<User> {
        let changes = UserChanges {
            image: Some(url),
            ..Default::default()
        };
        self.repo
            .update(id, changes)
            .await?
            .ok_or_else(|| AppError::NotFound(USER_MISSING.into()))
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: Uuid) -> AppResult<User> {
        let user = self
            .repo
            .delete(id)
            .await?
            .ok_or_else(|| AppError::NotFound(USER_MISSING.into()))?;
        info!(user_id = %id, "user deleted");
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn find_user_by_id(&self, id: Uuid) -> AppResult<User> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(USER_MISSING.into()))
    }

    /// Never fails on an empty collection.
    #[instrument(skip(self))]
    pub async fn find_all_users(&self) -> AppResult<Vec<User>> {
        self.repo.find_all().await
    }
}
