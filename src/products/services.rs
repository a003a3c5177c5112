use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{CreateProductRequest, UpdateProductRequest},
    repo::ProductRepository,
    repo_types::{NewProduct, Product, ProductChanges, Review},
};
use crate::errors::{AppError, AppResult};

const PRODUCT_MISSING: &str = "Product doesn't exist";

fn missing_by_id(id: Uuid) -> AppError {
    AppError::NotFound(format!("Product with ID {id} not found"))
}

fn pair_conflict(name: &str, model: &str) -> AppError {
    AppError::Conflict(format!(
        "This product {name} with model {model} already exists"
    ))
}

#[derive(Clone)]
pub struct ProductService {
    repo: Arc<dyn ProductRepository>,
}

impl ProductService {
    pub fn new(repo: Arc<dyn ProductRepository>) -> Self {
        Self { repo }
    }

    /// Never fails on an empty collection.
    #[instrument(skip(self))]
    pub async fn find_all_products(&self) -> AppResult<Vec<Product>> {
        self.repo.find_all().await
    }

    #[instrument(skip(self))]
    pub async fn find_product_by_id(&self, id: Uuid) -> AppResult<Product> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(PRODUCT_MISSING.into()))
    }

    /// Exact name match. Unlike `find_all_products`, an empty result is an
    /// error: the caller searched for something specific.
    #[instrument(skip(self))]
    pub async fn find_products_by_name(&self, name: &str) -> AppResult<Vec<Product>> {
        let products = self.repo.find_by_name(name).await?;
        if products.is_empty() {
            return Err(AppError::NotFound("No products found with that name".into()));
        }
        Ok(products)
    }

    #[instrument(skip(self, input), fields(product_name = %input.product_name))]
    pub async fn create_product(&self, input: CreateProductRequest) -> AppResult<Product> {
        if self
            .repo
            .find_by_name_and_model(&input.product_name, &input.product_model)
            .await?
            .is_some()
        {
            warn!(product_model = %input.product_model, "product already exists");
            return Err(pair_conflict(&input.product_name, &input.product_model));
        }

        let product = self
            .repo
            .create(NewProduct {
                product_name: input.product_name,
                product_model: input.product_model,
                price: input.price,
                description: input.description,
                product_image: input.product_image,
                reviews: input
                    .reviews
                    .unwrap_or_default()
                    .into_iter()
                    .map(Review::from)
                    .collect(),
            })
            .await?;

        info!(product_id = %product.id, "product created");
        Ok(product)
    }

    /// Partial update. Reviews cannot be changed through this path.
    #[instrument(skip(self, input))]
    pub async fn update_product(&self, id: Uuid, input: UpdateProductRequest) -> AppResult<Product> {
        let existing = self.repo.find_by_id(id).await?.ok_or_else(|| missing_by_id(id))?;

        let changes = ProductChanges::from(input);
        if changes.product_name.is_some() || changes.product_model.is_some() {
            let name = changes
                .product_name
                .as_deref()
                .unwrap_or(&existing.product_name);
            let model = changes
                .product_model
                .as_deref()
                .unwrap_or(&existing.product_model);
            if let Some(owner) = self.repo.find_by_name_and_model(name, model).await? {
                if owner.id != id {
                    warn!(%name, %model, "name/model pair owned by another product");
                    return Err(pair_conflict(name, model));
                }
            }
        }

        self.repo
            .update(id, changes)
            .await?
            .ok_or_else(|| missing_by_id(id))
    }

    /// Appends one review. The store applies the push atomically, so
    /// concurrent appends to the same product are all kept.
    #[instrument(skip(self, review))]
    pub async fn add_product_review(&self, id: Uuid, review: Review) -> AppResult<Product> {
        let product = self
            .repo
            .push_review(id, &review)
            .await?
            .ok_or_else(|| missing_by_id(id))?;
        info!(product_id = %id, reviews = product.reviews.len(), "review added");
        Ok(product)
    }

    #[instrument(skip(self))]
    pub async fn update_product_image(&self, id: Uuid, url: String) -> AppResult<Product> {
        let changes = ProductChanges {
            product_image: Some(url),
            ..Default::default()
        };
        self.repo
            .update(id, changes)
            .await?
            .ok_or_else(|| AppError::NotFound(PRODUCT_MISSING.into()))
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: Uuid) -> AppResult<Product> {
        let product = self
            .repo
            .delete(id)
            .await?
            .ok_or_else(|| AppError::NotFound(PRODUCT_MISSING.into()))?;
        info!(product_id = %id, "product deleted");
        Ok(product)
    }
}
