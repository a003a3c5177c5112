use axum::{
    extract::{DefaultBodyLimit, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tracing::instrument;

use super::dto::{CreateUserRequest, PublicUser, UpdateUserRequest};
use crate::{
    auth::extractors::CurrentUser,
    errors::AppResult,
    extract::{ApiResponse, IdPath, ValidatedJson},
    images::services::{store_image, ImageUpload, UploadKind, MAX_UPLOAD_BYTES},
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id", get(get_user))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user).put(update_current_user))
        .route("/users/:id", axum::routing::delete(delete_user))
        .route(
            "/users/upload",
            post(upload_user_image).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES * 2)),
        )
}

#[instrument(skip(state, _caller))]
pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(_caller): CurrentUser,
) -> AppResult<impl IntoResponse> {
    let users: Vec<PublicUser> = state
        .users
        .find_all_users()
        .await?
        .into_iter()
        .map(PublicUser::from)
        .collect();
    Ok(ApiResponse::ok(users, "findAll"))
}

#[instrument(skip(state, _caller))]
pub async fn get_user(
    State(state): State<AppState>,
    CurrentUser(_caller): CurrentUser,
    IdPath(id): IdPath,
) -> AppResult<impl IntoResponse> {
    let user = state.users.find_user_by_id(id).await?;
    Ok(ApiResponse::ok(PublicUser::from(user), "findOne"))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateUserRequest>,
) -> AppResult<impl IntoResponse> {
    let user = state.users.create_user(payload).await?;
    Ok(ApiResponse::created(PublicUser::from(user), "created"))
}

/// `PUT /users` always targets the authenticated caller.
#[instrument(skip(state, caller, payload), fields(user_id = %caller.id))]
pub async fn update_current_user(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    ValidatedJson(payload): ValidatedJson<UpdateUserRequest>,
) -> AppResult<impl IntoResponse> {
    let user = state.users.update_user(caller.id, payload).await?;
    Ok(ApiResponse::ok(PublicUser::from(user), "updated"))
}

#[instrument(skip(state, _caller))]
pub async fn delete_user(
    State(state): State<AppState>,
    CurrentUser(_caller): CurrentUser,
    IdPath(id): IdPath,
) -> AppResult<impl IntoResponse> {
    let user = state.users.delete_user(id).await?;
    Ok(ApiResponse::ok(PublicUser::from(user), "deleted"))
}

#[instrument(skip(state, caller, upload), fields(user_id = %caller.id))]
pub async fn upload_user_image(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    upload: ImageUpload,
) -> AppResult<impl IntoResponse> {
    let url = store_image(state.storage.as_ref(), UploadKind::Profile, caller.id, upload).await?;
    let user = state.users.update_user_image(caller.id, url).await?;
    Ok(ApiResponse::ok(PublicUser::from(user), "image uploaded"))
}
