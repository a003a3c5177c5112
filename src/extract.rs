use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::errors::AppError;

/// Success envelope shared by every handler.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
    pub message: String,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> (StatusCode, Json<Self>) {
        Self::with_status(StatusCode::OK, data, message)
    }

    pub fn created(data: T, message: impl Into<String>) -> (StatusCode, Json<Self>) {
        Self::with_status(StatusCode::CREATED, data, message)
    }

    fn with_status(status: StatusCode, data: T, message: impl Into<String>) -> (StatusCode, Json<Self>) {
        (
            status,
            Json(Self {
                data,
                message: message.into(),
            }),
        )
    }
}

/// JSON body that has passed its `Validate` rules. All violations are
/// reported together.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = Json::<T>::from_request(req, state).await?;
        data.validate()?;
        Ok(ValidatedJson(data))
    }
}

/// `:id` path segment parsed as a document identifier.
pub struct IdPath(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for IdPath
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        Uuid::parse_str(&raw)
            .map(IdPath)
            .map_err(|_| AppError::BadRequest(format!("Invalid id: {raw}")).into_response())
    }
}
