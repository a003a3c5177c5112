use anyhow::Context;
use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    options::{IndexOptions, ReturnDocument},
    Collection, Database, IndexModel,
};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::instrument;
use uuid::Uuid;

use super::repo_types::{NewUser, User, UserChanges};
use crate::{db::id_filter, errors::AppResult};

/// Name of the unique index on `email`.
pub const EMAIL_INDEX: &str = "idx_email_unique";

/// Persistence for user documents.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, input: NewUser) -> AppResult<User>;
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;
    /// Exact, case-sensitive match.
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn find_all(&self) -> AppResult<Vec<User>>;
    /// Returns the updated document, or `None` when `id` does not resolve.
    async fn update(&self, id: Uuid, changes: UserChanges) -> AppResult<Option<User>>;
    /// Returns the removed document, or `None` when `id` does not resolve.
    async fn delete(&self, id: Uuid) -> AppResult<Option<User>>;
}

pub struct MongoUserRepository {
    collection: Collection<User>,
}

impl MongoUserRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection::<User>("users"),
        }
    }

    /// Unique email index; racing registrations past the service check fail
    /// here with a duplicate-key error.
    pub async fn init_indexes(&self) -> AppResult<()> {
        let email = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name(EMAIL_INDEX.to_string())
                    .build(),
            )
            .build();
        self.collection.create_index(email).await?;
        tracing::info!("user indexes ready");
        Ok(())
    }

    fn set_document(changes: &UserChanges) -> AppResult<Document> {
        let updated_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .context("format updated_at")?;
        let mut set = doc! { "updated_at": updated_at };
        if let Some(email) = &changes.email {
            set.insert("email", email.as_str());
        }
        if let Some(first_name) = &changes.first_name {
            set.insert("first_name", first_name.as_str());
        }
        if let Some(last_name) = &changes.last_name {
            set.insert("last_name", last_name.as_str());
        }
        if let Some(phone_number) = &changes.phone_number {
            set.insert("phone_number", phone_number.as_str());
        }
        if let Some(image) = &changes.image {
            set.insert("image", image.as_str());
        }
        Ok(set)
    }
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    #[instrument(skip(self, input), fields(email = %input.email))]
    async fn create(&self, input: NewUser) -> AppResult<User> {
        let user = User::from_new(input);
        self.collection.insert_one(&user).await?;
        tracing::info!(user_id = %user.id, "user inserted");
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.collection.find_one(id_filter(id)).await?)
    }

    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self.collection.find_one(doc! { "email": email }).await?)
    }

    #[instrument(skip(self))]
    async fn find_all(&self) -> AppResult<Vec<User>> {
        let cursor = self.collection.find(doc! {}).await?;
        Ok(cursor.try_collect().await?)
    }

    #[instrument(skip(self, changes))]
    async fn update(&self, id: Uuid, changes: UserChanges) -> AppResult<Option<User>> {
        let set = Self::set_document(&changes)?;
        let updated = self
            .collection
            .find_one_and_update(id_filter(id), doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await?;
        Ok(updated)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> AppResult<Option<User>> {
        let removed = self.collection.find_one_and_delete(id_filter(id)).await?;
        if removed.is_some() {
            tracing::info!(user_id = %id, "user removed");
        }
        Ok(removed)
    }
}
