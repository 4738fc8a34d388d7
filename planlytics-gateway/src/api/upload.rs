//! POST /api/upload
//!
//! Streams the multipart `file` field to the uploads directory under a
//! fresh session token and answers `{ filename, size }`.

use axum::{
    extract::{multipart::Field, DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use planlytics_common::api::{UploadResponse, UPLOAD_FIELD, UPLOAD_PATH};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::info;
use uuid::Uuid;

use crate::{ApiError, ApiResult, AppState};

const JOB_ID_LEN: usize = 12;

/// Final path component of a client-supplied name
///
/// Anything outside `[A-Za-z0-9._-]` becomes `_`, so the stored name can be
/// used verbatim as a `/files` URL path segment.
pub fn safe_basename(name: &str) -> String {
    name.rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// `<job-id>__<safe basename>`
pub fn stored_name(original: &str) -> String {
    let token = Uuid::new_v4().simple().to_string();
    format!("{}__{}", &token[..JOB_ID_LEN], safe_basename(original))
}

fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_ascii_lowercase()))
        .unwrap_or_default()
}

pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let original = field.file_name().map(safe_basename).unwrap_or_default();
        if original.is_empty() {
            return Err(ApiError::BadRequest("No file selected".to_string()));
        }
        let ext = extension_of(&original);
        if !state.config.is_allowed_extension(&ext) {
            return Err(ApiError::BadRequest(format!("Unsupported file type: {}", ext)));
        }

        tokio::fs::create_dir_all(&state.config.uploads_dir).await?;
        let name = stored_name(&original);
        let dest = state.config.uploads_dir.join(&name);

        let size = match save_field(field, &dest, state.config.max_upload_bytes).await {
            Ok(size) => size,
            Err(e) => {
                let _ = tokio::fs::remove_file(&dest).await;
                if !matches!(e, ApiError::PayloadTooLarge(_)) {
                    state.record_error(format!("Upload failed: {}", e)).await;
                }
                return Err(e);
            }
        };

        info!("Saved upload {} ({} bytes)", name, size);
        return Ok(Json(UploadResponse {
            filename: Some(name),
            size: Some(size),
        }));
    }

    Err(ApiError::BadRequest(format!(
        "Missing multipart field '{}'",
        UPLOAD_FIELD
    )))
}

/// Stream one field to disk, failing once `max_bytes` is exceeded
async fn save_field(mut field: Field<'_>, dest: &Path, max_bytes: u64) -> ApiResult<u64> {
    let mut file = tokio::fs::File::create(dest).await?;
    let mut size: u64 = 0;

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Upload interrupted: {}", e)))?
    {
        size += chunk.len() as u64;
        if size > max_bytes {
            return Err(ApiError::PayloadTooLarge("File too large".to_string()));
        }
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    Ok(size)
}

pub fn upload_routes() -> Router<AppState> {
    Router::new().route(
        UPLOAD_PATH,
        post(upload).layer(DefaultBodyLimit::disable()),
    )
}
