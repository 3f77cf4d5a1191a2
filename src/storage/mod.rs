//! Object-storage collaborator for uploaded images.
//!
//! Assets live on an external image host and are referenced by URL from
//! creator and product rows. The host is reached through the [`AssetStore`]
//! trait so handlers and the cleanup worker never depend on a concrete
//! backend; [`cloudinary::CloudinaryStore`] is the production
//! implementation and [`NullStore`] stands in when storage is not
//! configured.

pub mod cleanup;
pub mod cloudinary;

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use crate::config::StorageConfig;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object storage is not configured")]
    NotConfigured,
    #[error("storage request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("storage rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// A successfully stored asset.
#[derive(Debug, Clone)]
pub struct UploadedAsset {
    /// Publicly reachable URL, stored on the owning database row
    pub url: String,
    /// Identifier the host needs to delete the asset later
    pub public_id: String,
}

#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Upload an image under `file_stem` (no extension) and return its URL.
    async fn upload(
        &self,
        file_stem: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<UploadedAsset, StorageError>;

    /// Delete the asset identified by `public_id`. Deleting an asset that
    /// no longer exists is not an error.
    async fn delete(&self, public_id: &str) -> Result<(), StorageError>;
}

/// Build the configured store, falling back to [`NullStore`] when the
/// storage section is incomplete.
pub fn from_config(config: &StorageConfig) -> Arc<dyn AssetStore> {
    if config.is_configured() {
        Arc::new(cloudinary::CloudinaryStore::new(config.clone()))
    } else {
        warn!("Object storage not configured, image uploads are disabled");
        Arc::new(NullStore)
    }
}

/// Store used when no storage credentials are configured. Uploads fail,
/// deletions succeed so the cleanup outbox can still drain.
pub struct NullStore;

#[async_trait]
impl AssetStore for NullStore {
    async fn upload(
        &self,
        _file_stem: &str,
        _content_type: &str,
        _data: Bytes,
    ) -> Result<UploadedAsset, StorageError> {
        Err(StorageError::NotConfigured)
    }

    async fn delete(&self, public_id: &str) -> Result<(), StorageError> {
        warn!(public_id, "Storage not configured, dropping asset deletion");
        Ok(())
    }
}

/// Derive the host-side identifier of an asset from its URL.
///
/// Pure string operation: split the URL path into segments, strip the file
/// extension from the last segment, and join the second-to-last segment
/// (the folder) with the stripped filename using `/`.
pub fn public_id_from_url(url: &str) -> Option<String> {
    // Drop scheme, query and fragment; keep only the path
    let rest = url.split_once("://").map(|(_, r)| r).unwrap_or(url);
    let rest = rest.split(['?', '#']).next().unwrap_or(rest);
    let path = rest.split_once('/').map(|(_, p)| p)?;

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() < 2 {
        return None;
    }

    let file = segments[segments.len() - 1];
    let folder = segments[segments.len() - 2];
    let stem = file.rsplit_once('.').map(|(s, _)| s).unwrap_or(file);
    if stem.is_empty() {
        return None;
    }

    Some(format!("{}/{}", folder, stem))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_id_from_url() {
        assert_eq!(
            public_id_from_url(
                "https://res.cloudinary.com/demo/image/upload/v17/atelier/profile_7.png"
            ),
            Some("atelier/profile_7".to_string())
        );
        assert_eq!(
            public_id_from_url("https://images.example.com/atelier/product_42.jpeg"),
            Some("atelier/product_42".to_string())
        );
    }

    #[test]
    fn test_public_id_ignores_query_and_fragment() {
        assert_eq!(
            public_id_from_url("https://images.example.com/pix/a.png?w=200#top"),
            Some("pix/a".to_string())
        );
    }

    #[test]
    fn test_public_id_without_extension() {
        assert_eq!(
            public_id_from_url("https://images.example.com/pix/raw"),
            Some("pix/raw".to_string())
        );
    }

    #[test]
    fn test_public_id_rejects_short_paths() {
        assert_eq!(public_id_from_url(""), None);
        assert_eq!(public_id_from_url("https://images.example.com/"), None);
        assert_eq!(public_id_from_url("https://images.example.com/only"), None);
    }
}
