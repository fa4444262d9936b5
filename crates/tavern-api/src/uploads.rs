use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use sha2::{Digest, Sha256};
use tracing::{error, info};

use tavern_types::api::UploadResponse;

use crate::auth::AppState;
use crate::error::ApiError;

/// 10 MB upload limit for images
pub const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

fn extension_for(content_type: &str) -> Option<&'static str> {
    // Ignore parameters such as `; charset=...`
    let mime = content_type.split(';').next().unwrap_or_default().trim();
    match mime {
        "image/png" => Some("png"),
        "image/jpeg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// POST /upload-image — accepts raw image bytes, stores them under their
/// SHA-256 digest in the upload directory and returns the public URL.
pub async fn upload_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    bytes: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let ext = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(extension_for)
        .ok_or_else(|| ApiError::UnsupportedMediaType("Unsupported image type".into()))?;

    if bytes.is_empty() {
        return Err(ApiError::bad_request("Empty upload"));
    }

    let digest = hex::encode(Sha256::digest(&bytes));
    let file_name = format!("{}.{}", digest, ext);

    tokio::fs::create_dir_all(&state.upload_dir).await.map_err(|e| {
        error!("Failed to create upload directory: {}", e);
        anyhow::anyhow!(e)
    })?;

    let path = state.upload_dir.join(&file_name);
    tokio::fs::write(&path, &bytes).await.map_err(|e| {
        error!("Failed to write upload {}: {}", path.display(), e);
        anyhow::anyhow!(e)
    })?;

    info!("Stored upload {} ({} bytes)", file_name, bytes.len());

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            image_url: format!("/uploads/{}", file_name),
        }),
    ))
}
