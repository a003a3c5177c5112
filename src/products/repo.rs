use async_trait::async_trait;
use anyhow::Context;
use futures_util::TryStreamExt;
use mongodb::{
    bson::{doc, to_bson, Document},
    options::{IndexOptions, ReturnDocument},
    Collection, Database, IndexModel,
};
use tracing::instrument;
use uuid::Uuid;

use super::repo_types::{NewProduct, Product, ProductChanges, Review};
use crate::{db::id_filter, errors::AppResult};

/// Name of the unique index on (`product_name`, `product_model`).
pub const NAME_MODEL_INDEX: &str = "idx_name_model_unique";

/// Persistence for product documents.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn create(&self, input: NewProduct) -> AppResult<Product>;
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Product>>;
    async fn find_all(&self) -> AppResult<Vec<Product>>;
    /// Exact match on `product_name`.
    async fn find_by_name(&self, name: &str) -> AppResult<Vec<Product>>;
    async fn find_by_name_and_model(&self, name: &str, model: &str)
        -> AppResult<Option<Product>>;
    /// Returns the updated document, or `None` when `id` does not resolve.
    async fn update(&self, id: Uuid, changes: ProductChanges) -> AppResult<Option<Product>>;
    /// Appends to `reviews` in one atomic write and returns the updated
    /// document, or `None` when `id` does not resolve.
    async fn push_review(&self, id: Uuid, review: &Review) -> AppResult<Option<Product>>;
    /// Returns the removed document, or `None` when `id` does not resolve.
    async fn delete(&self, id: Uuid) -> AppResult<Option<Product>>;
}

pub struct MongoProductRepository {
    collection: Collection<Product>,
}

impl MongoProductRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection::<Product>("products"),
        }
    }

    /// The (name, model) pair is the uniqueness scope; name alone is not.
    pub async fn init_indexes(&self) -> AppResult<()> {
        let indexes = vec![
            IndexModel::builder()
                .keys(doc! { "product_name": 1, "product_model": 1 })
                .options(
                    IndexOptions::builder()
                        .unique(true)
                        .name(NAME_MODEL_INDEX.to_string())
                        .build(),
                )
                .build(),
        ];
        self.collection.create_indexes(indexes).await?;
        tracing::info!("product indexes ready");
        Ok(())
    }

    fn set_document(changes: &ProductChanges) -> Document {
        let mut set = Document::new();
        if let Some(product_name) = &changes.product_name {
            set.insert("product_name", product_name.as_str());
        }
        if let Some(product_model) = &changes.product_model {
            set.insert("product_model", product_model.as_str());
        }
        if let Some(price) = changes.price {
            set.insert("price", price);
        }
        if let Some(description) = &changes.description {
            set.insert("description", description.as_str());
        }
        if let Some(product_image) = &changes.product_image {
            set.insert("product_image", product_image.as_str());
        }
        set
    }

    /// Single-stage update pipeline appending `review`. A missing, `null` or
    /// non-array `reviews` field is replaced by a one-element list.
    fn append_review_pipeline(review: &Review) -> AppResult<Vec<Document>> {
        let review = to_bson(review).context("encode review")?;
        Ok(vec![doc! {
            "$set": {
                "reviews": {
                    "$concatArrays": [
                        { "$cond": [{ "$isArray": "$reviews" }, "$reviews", []] },
                        [{ "$literal": review }]
                    ]
                }
            }
        }])
    }
}

#[async_trait]
impl ProductRepository for MongoProductRepository {
    #[instrument(skip(self, input), fields(product_name = %input.product_name))]
    async fn create(&self, input: NewProduct) -> AppResult<Product> {
        let product = Product::from_new(input);
        self.collection.insert_one(&product).await?;
        tracing::info!(product_id = %product.id, "product inserted");
        Ok(product)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Product>> {
        Ok(self.collection.find_one(id_filter(id)).await?)
    }

    #[instrument(skip(self))]
    async fn find_all(&self) -> AppResult<Vec<Product>> {
        let cursor = self.collection.find(doc! {}).await?;
        Ok(cursor.try_collect().await?)
    }

    #[instrument(skip(self))]
    async fn find_by_name(&self, name: &str) -> AppResult<Vec<Product>> {
        let cursor = self.collection.find(doc! { "product_name": name }).await?;
        Ok(cursor.try_collect().await?)
    }

    #[instrument(skip(self))]
    async fn find_by_name_and_model(
        &self,
        name: &str,
        model: &str,
    ) -> AppResult<Option<Product>> {
        let filter = doc! { "product_name": name, "product_model": model };
        Ok(self.collection.find_one(filter).await?)
    }

    #[instrument(skip(self, changes))]
    async fn update(&self, id: Uuid, changes: ProductChanges) -> AppResult<Option<Product>> {
        if changes.is_empty() {
            return self.find_by_id(id).await;
        }
        let updated = self
            .collection
            .find_one_and_update(id_filter(id), doc! { "$set": Self::set_document(&changes) })
            .return_document(ReturnDocument::After)
            .await?;
        Ok(updated)
    }

    #[instrument(skip(self, review))]
    async fn push_review(&self, id: Uuid, review: &Review) -> AppResult<Option<Product>> {
        let updated = self
            .collection
            .find_one_and_update(id_filter(id), Self::append_review_pipeline(review)?)
            .return_document(ReturnDocument::After)
            .await?;
        Ok(updated)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> AppResult<Option<Product>> {
        let removed = self.collection.find_one_and_delete(id_filter(id)).await?;
        if removed.is_some() {
            tracing::info!(product_id = %id, "product removed");
        }
        Ok(removed)
    }
}
