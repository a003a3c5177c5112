use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use super::services::AuthRejection;
use crate::{errors::AppError, state::AppState, users::repo_types::User};

/// Resolves the bearer token to the caller's full user record.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthRejection::Missing)?;

        // Expect "Bearer <token>"
        let token = header
            .to_str()
            .ok()
            .and_then(|h| h.strip_prefix("Bearer ").or_else(|| h.strip_prefix("bearer ")))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                warn!("malformed Authorization header");
                AuthRejection::Invalid
            })?;

        let user = state.auth.authenticate(token).await?;
        Ok(CurrentUser(user))
    }
}
