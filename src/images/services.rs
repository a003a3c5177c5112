use axum::{
    async_trait,
    extract::{multipart::MultipartError, FromRequest, Multipart, Request},
    http::StatusCode,
};
use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    errors::{AppError, AppResult},
    storage::StorageClient,
};

/// Largest accepted image.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

const FILE_FIELD: &str = "file";

/// The single image carried by a multipart request under the `file` field,
/// fully buffered in memory.
#[derive(Debug)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub body: Bytes,
}

/// Owner namespace of an uploaded object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Profile,
    Product,
}

impl UploadKind {
    fn prefix(self) -> &'static str {
        match self {
            UploadKind::Profile => "uploads/profile",
            UploadKind::Product => "uploads/products",
        }
    }
}

#[async_trait]
impl<S> FromRequest<S> for ImageUpload
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        let mut upload: Option<ImageUpload> = None;
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            if field.name() != Some(FILE_FIELD) {
                continue;
            }
            if upload.is_some() {
                return Err(AppError::BadRequest("Only one file may be uploaded".into()));
            }

            let content_type = field.content_type().unwrap_or_default().to_string();
            if !is_image(&content_type) {
                warn!(%content_type, "rejected non-image upload");
                return Err(AppError::BadRequest("File must be of image type".into()));
            }
            let file_name = field.file_name().unwrap_or_default().to_string();
            let body = field.bytes().await.map_err(multipart_error)?;
            if body.len() > MAX_UPLOAD_BYTES {
                return Err(too_large());
            }

            upload = Some(ImageUpload {
                file_name,
                content_type,
                body,
            });
        }

        upload.ok_or_else(|| AppError::BadRequest("file is required".into()))
    }
}

fn too_large() -> AppError {
    AppError::PayloadTooLarge(format!(
        "File exceeds the {} MiB limit",
        MAX_UPLOAD_BYTES / (1024 * 1024)
    ))
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large()
    } else {
        AppError::BadRequest(e.body_text())
    }
}

fn is_image(content_type: &str) -> bool {
    content_type
        .split('/')
        .next()
        .is_some_and(|primary| primary.trim().eq_ignore_ascii_case("image"))
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

/// Keeps `[A-Za-z0-9._-]` from the client's file name; everything else
/// becomes `_`. Falls back to `image.<ext>` when nothing usable is left.
fn safe_file_name(file_name: &str, content_type: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches(['.', '_']).is_empty() {
        format!("image.{}", ext_from_mime(content_type).unwrap_or("bin"))
    } else {
        cleaned
    }
}

pub fn object_key(kind: UploadKind, owner: Uuid, file_name: &str, content_type: &str) -> String {
    format!(
        "{}/{}-{}",
        kind.prefix(),
        owner,
        safe_file_name(file_name, content_type)
    )
}

/// Writes the image to object storage and returns its public URL.
pub async fn store_image(
    storage: &dyn StorageClient,
    kind: UploadKind,
    owner: Uuid,
    upload: ImageUpload,
) -> AppResult<String> {
    let key = object_key(kind, owner, &upload.file_name, &upload.content_type);
    let size = upload.body.len();
    storage
        .put_object(&key, upload.body, &upload.content_type)
        .await?;
    info!(%key, size, "image stored");
    Ok(storage.object_url(&key))
}
