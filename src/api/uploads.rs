//! Multipart image upload.
//!
//! The client uploads the image first and receives its URL, then references
//! that URL when creating a product or lets the handler attach it to the
//! profile. The asset is named after the row it belongs to
//! (`profile_<id>` / `product_<id>`) so reuploads overwrite instead of
//! piling up.

use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use std::sync::Arc;

use super::error::ApiError;
use super::Success;
use crate::db::Creator;
use crate::storage::cleanup;
use crate::AppState;

/// Derive the asset name from the optional owner fields.
fn file_stem(profile_id: Option<&str>, product_id: Option<&str>) -> String {
    if let Some(id) = profile_id {
        format!("profile_{}", id)
    } else if let Some(id) = product_id {
        format!("product_{}", id)
    } else {
        format!("upload_{}", uuid::Uuid::new_v4().simple())
    }
}

/// Check the file extension against the configured allow-list and return it
/// lowercased.
fn validate_extension(file_name: &str, allowed: &[String]) -> Result<String, String> {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, e)| e.to_ascii_lowercase())
        .ok_or_else(|| "file has no extension".to_string())?;

    if !allowed.iter().any(|a| a.eq_ignore_ascii_case(&ext)) {
        return Err(format!(
            "file type '{}' not allowed, use one of: {}",
            ext,
            allowed.join(", ")
        ));
    }

    Ok(ext)
}

/// Upload an image to object storage
///
/// POST /image
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    creator: Creator,
    mut multipart: Multipart,
) -> Result<Json<Success<String>>, ApiError> {
    let mut file: Option<(String, Bytes)> = None;
    let mut profile_id: Option<String> = None;
    let mut product_id: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field
                    .file_name()
                    .map(|s| s.to_string())
                    .ok_or_else(|| ApiError::validation_field("file", "file name is required"))?;
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("failed to read upload: {}", e)))?;
                file = Some((file_name, data));
            }
            "profileId" => {
                profile_id = field.text().await.ok().filter(|s| !s.is_empty());
            }
            "productId" => {
                product_id = field.text().await.ok().filter(|s| !s.is_empty());
            }
            _ => {}
        }
    }

    let (file_name, data) =
        file.ok_or_else(|| ApiError::validation_field("file", "file part is required"))?;
    if data.is_empty() {
        return Err(ApiError::validation_field("file", "file is empty"));
    }

    let ext = validate_extension(&file_name, &state.config.storage.allowed_formats)
        .map_err(|e| ApiError::validation_field("file", e))?;
    let content_type = mime_guess::from_ext(&ext).first_or_octet_stream();

    let stem = file_stem(profile_id.as_deref(), product_id.as_deref());
    let for_profile = profile_id.is_some();

    let asset = state
        .assets
        .upload(&stem, content_type.as_ref(), data)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Image upload failed");
            ApiError::internal("image upload failed")
        })?;

    // A profile upload replaces the stored URL; the old asset goes to the
    // cleanup outbox instead of leaking
    if for_profile {
        let mut tx = state.db.begin().await?;
        sqlx::query("UPDATE creators SET profile_image_url = ?, updated_at = ? WHERE id = ?")
            .bind(&asset.url)
            .bind(chrono::Utc::now().to_rfc3339())
            .bind(creator.id)
            .execute(&mut *tx)
            .await?;
        if creator.profile_image_url != asset.url {
            cleanup::enqueue(&mut tx, &creator.profile_image_url).await?;
        }
        tx.commit().await?;
    }

    tracing::info!(
        creator_id = creator.id,
        public_id = %asset.public_id,
        "Image uploaded"
    );

    Ok(Json(Success {
        success: asset.url,
    }))
}
