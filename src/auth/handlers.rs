use axum::{
    extract::State,
    http::header::SET_COOKIE,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tracing::instrument;

use super::{
    dto::LoginRequest,
    extractors::CurrentUser,
    services::AuthService,
};
use crate::{
    errors::AppResult,
    extract::{ApiResponse, ValidatedJson},
    state::AppState,
    users::dto::PublicUser,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let res = state.auth.login(payload).await?;
    let cookie = state.auth.login_cookie(&res.token);
    Ok((
        [(SET_COOKIE, cookie)],
        ApiResponse::ok(res, "login"),
    ))
}

#[instrument(skip(state, user))]
pub async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<impl IntoResponse> {
    let user = state.auth.logout(user.id).await?;
    Ok((
        [(SET_COOKIE, AuthService::logout_cookie().to_string())],
        ApiResponse::ok(PublicUser::from(user), "logout"),
    ))
}

#[instrument(skip(user))]
pub async fn get_me(CurrentUser(user): CurrentUser) -> impl IntoResponse {
    ApiResponse::ok(PublicUser::from(user), "current user")
}
