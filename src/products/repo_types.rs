use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// One entry of a product's review list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: String,     // review id
    pub name: String,   // author name
    pub review: String, // review text
}

/// Product document in the `products` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "_id", with = "crate::db::uuid_as_binary")]
    pub id: Uuid,
    pub product_name: String,
    pub product_model: String,
    pub price: f64,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_image: Option<String>,
    #[serde(default, deserialize_with = "reviews_or_empty")]
    pub reviews: Vec<Review>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub product_name: String,
    pub product_model: String,
    pub price: f64,
    pub description: String,
    pub product_image: Option<String>,
    pub reviews: Vec<Review>,
}

/// Partial update. Reviews are deliberately absent: they only grow through
/// the append path.
#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
    pub product_name: Option<String>,
    pub product_model: Option<String>,
    pub price: Option<f64>,
    pub description: Option<String>,
    pub product_image: Option<String>,
}

impl Product {
    pub fn from_new(input: NewProduct) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_name: input.product_name,
            product_model: input.product_model,
            price: input.price,
            description: input.description,
            product_image: input.product_image,
            reviews: input.reviews,
        }
    }

    /// In-memory equivalent of the repository's `$set`.
    #[cfg(test)]
    pub fn apply(&mut self, changes: ProductChanges) {
        if let Some(product_name) = changes.product_name {
            self.product_name = product_name;
        }
        if let Some(product_model) = changes.product_model {
            self.product_model = product_model;
        }
        if let Some(price) = changes.price {
            self.price = price;
        }
        if let Some(description) = changes.description {
            self.description = description;
        }
        if let Some(product_image) = changes.product_image {
            self.product_image = Some(product_image);
        }
    }
}

impl ProductChanges {
    pub fn is_empty(&self) -> bool {
        self.product_name.is_none()
            && self.product_model.is_none()
            && self.price.is_none()
            && self.description.is_none()
            && self.product_image.is_none()
    }
}

/// Older documents may hold `null` or a scalar under `reviews`; read those as
/// an empty list instead of failing the whole document.
fn reviews_or_empty<'de, D>(deserializer: D) -> Result<Vec<Review>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Stored {
        List(Vec<Review>),
        Other(serde::de::IgnoredAny),
    }

    Ok(match Stored::deserialize(deserializer)? {
        Stored::List(reviews) => reviews,
        Stored::Other(_) => Vec::new(),
    })
}
