use axum::{
    extract::{DefaultBodyLimit, Path, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{AddReviewRequest, CreateProductRequest, UpdateProductRequest},
    repo_types::Review,
};
use crate::{
    auth::extractors::CurrentUser,
    errors::AppResult,
    extract::{ApiResponse, IdPath, ValidatedJson},
    images::services::{store_image, ImageUpload, UploadKind, MAX_UPLOAD_BYTES},
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
        .route("/products/name/:name", get(get_products_by_name))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/products", post(create_product))
        .route("/products/:id", axum::routing::put(update_product).delete(delete_product))
        .route("/products/:id/review", post(add_review))
        .route(
            "/products/upload/:id",
            post(upload_product_image).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES * 2)),
        )
}

#[instrument(skip(state))]
pub async fn list_products(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let products = state.products.find_all_products().await?;
    Ok(ApiResponse::ok(products, "All products retrieved successfully"))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> AppResult<impl IntoResponse> {
    let product = state.products.find_product_by_id(id).await?;
    Ok(ApiResponse::ok(product, "Product retrieved successfully"))
}

#[instrument(skip(state))]
pub async fn get_products_by_name(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<impl IntoResponse> {
    let products = state.products.find_products_by_name(&name).await?;
    Ok(ApiResponse::ok(
        products,
        format!("Products with name '{name}' retrieved successfully"),
    ))
}

#[instrument(skip(state, _caller, payload))]
pub async fn create_product(
    State(state): State<AppState>,
    CurrentUser(_caller): CurrentUser,
    ValidatedJson(payload): ValidatedJson<CreateProductRequest>,
) -> AppResult<impl IntoResponse> {
    let product = state.products.create_product(payload).await?;
    Ok(ApiResponse::created(product, "Product created successfully"))
}

#[instrument(skip(state, _caller, payload))]
pub async fn update_product(
    State(state): State<AppState>,
    CurrentUser(_caller): CurrentUser,
    IdPath(id): IdPath,
    ValidatedJson(payload): ValidatedJson<UpdateProductRequest>,
) -> AppResult<impl IntoResponse> {
    let product = state.products.update_product(id, payload).await?;
    Ok(ApiResponse::ok(product, "Product updated successfully"))
}

#[instrument(skip(state, _caller))]
pub async fn delete_product(
    State(state): State<AppState>,
    CurrentUser(_caller): CurrentUser,
    IdPath(id): IdPath,
) -> AppResult<impl IntoResponse> {
    let product = state.products.delete_product(id).await?;
    Ok(ApiResponse::ok(product, "Product deleted successfully"))
}

#[instrument(skip(state, caller, payload), fields(user_id = %caller.id))]
pub async fn add_review(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    IdPath(id): IdPath,
    ValidatedJson(payload): ValidatedJson<AddReviewRequest>,
) -> AppResult<impl IntoResponse> {
    let review = Review {
        id: payload.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
        name: payload.name.unwrap_or_else(|| caller.full_name()),
        review: payload.review,
    };
    let product = state.products.add_product_review(id, review).await?;
    Ok(ApiResponse::ok(product, "Review added successfully"))
}

#[instrument(skip(state, _caller, upload))]
pub async fn upload_product_image(
    State(state): State<AppState>,
    CurrentUser(_caller): CurrentUser,
    IdPath(id): IdPath,
    upload: ImageUpload,
) -> AppResult<impl IntoResponse> {
    // Resolve first so nothing is written for an unknown product.
    state.products.find_product_by_id(id).await?;
    let url = store_image(state.storage.as_ref(), UploadKind::Product, id, upload).await?;
    let product = state.products.update_product_image(id, url).await?;
    Ok(ApiResponse::ok(product, "Product image uploaded successfully"))
}
