use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mongodb::error::{ErrorKind, WriteFailure};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};
use validator::ValidationErrors;

use crate::{products::repo::NAME_MODEL_INDEX, users::repo::EMAIL_INDEX};

const DUPLICATE_KEY: i32 = 11000;

pub type AppResult<T> = Result<T, AppError>;

/// Every failure a request can end with. Converted to an HTTP response in
/// exactly one place (`IntoResponse` below).
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<serde_json::Value>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            AppError::Validation(e) => ErrorBody {
                message: validation_message(&e),
                errors: Some(field_messages(&e)),
            },
            AppError::Internal(e) => {
                error!(error = ?e, "request failed");
                ErrorBody {
                    message: "Internal server error".into(),
                    errors: None,
                }
            }
            other => ErrorBody {
                message: other.to_string(),
                errors: None,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        if let Some(message) = duplicate_key_message(&err) {
            warn!(error = %err, "duplicate key rejected by store");
            return duplicate_key_conflict(message);
        }
        AppError::Internal(anyhow::Error::new(err).context("document store"))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// Server message of a duplicate-key failure; it names the refusing index.
fn duplicate_key_message(err: &mongodb::error::Error) -> Option<&str> {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY => {
            Some(&e.message)
        }
        ErrorKind::Command(e) if e.code == DUPLICATE_KEY => Some(&e.message),
        _ => None,
    }
}

/// `Conflict` for a write refused by a unique index, worded after the index
/// named in `detail`.
pub fn duplicate_key_conflict(detail: &str) -> AppError {
    let message = if detail.contains(EMAIL_INDEX) {
        "This email already exists"
    } else if detail.contains(NAME_MODEL_INDEX) {
        "This product name and model already exist"
    } else {
        "Document already exists"
    };
    AppError::Conflict(message.into())
}

/// Sorted `field: message` pairs so the summary is stable.
fn validation_pairs(errors: &ValidationErrors) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    collect_pairs(errors, "", &mut pairs);
    pairs.sort();
    pairs
}

fn collect_pairs(errors: &ValidationErrors, prefix: &str, out: &mut Vec<(String, String)>) {
    use validator::ValidationErrorsKind;

    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                for e in list {
                    let msg = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string());
                    out.push((path.clone(), msg));
                }
            }
            ValidationErrorsKind::Struct(inner) => collect_pairs(inner, &path, out),
            ValidationErrorsKind::List(items) => {
                for (idx, inner) in items {
                    collect_pairs(inner, &format!("{path}[{idx}]"), out);
                }
            }
        }
    }
}

fn validation_message(errors: &ValidationErrors) -> String {
    let parts: Vec<String> = validation_pairs(errors)
        .into_iter()
        .map(|(field, msg)| format!("{field}: {msg}"))
        .collect();
    format!("Validation failed: {}", parts.join(", "))
}

fn field_messages(errors: &ValidationErrors) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for (field, msg) in validation_pairs(errors) {
        let entry = map
            .entry(field)
            .or_insert_with(|| serde_json::Value::Array(Vec::new()));
        if let serde_json::Value::Array(list) = entry {
            list.push(serde_json::Value::String(msg));
        }
    }
    serde_json::Value::Object(map)
}
