use serde::Deserialize;
use validator::Validate;

use super::repo_types::{ProductChanges, Review};

/// Review as supplied when creating a product.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReviewInput {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub id: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub name: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub review: String,
}

impl From<ReviewInput> for Review {
    fn from(r: ReviewInput) -> Self {
        Self {
            id: r.id,
            name: r.name,
            review: r.review,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub product_name: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub product_model: String,
    #[validate(range(min = 0.0, message = "must not be negative"))]
    pub price: f64,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub description: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub product_image: Option<String>,
    #[validate(nested)]
    pub reviews: Option<Vec<ReviewInput>>,
}

/// Partial update body. Unknown keys, `reviews` included, are ignored.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub product_name: Option<String>,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub product_model: Option<String>,
    #[validate(range(min = 0.0, message = "must not be negative"))]
    pub price: Option<f64>,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub description: Option<String>,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub product_image: Option<String>,
}

impl From<UpdateProductRequest> for ProductChanges {
    fn from(r: UpdateProductRequest) -> Self {
        Self {
            product_name: r.product_name,
            product_model: r.product_model,
            price: r.price,
            description: r.description,
            product_image: r.product_image,
        }
    }
}

/// Body of `POST /products/:id/review`. The id defaults to a fresh UUID and
/// the author name to the caller's full name.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct AddReviewRequest {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub id: Option<String>,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub review: String,
}
