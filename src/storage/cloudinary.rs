//! Cloudinary-backed [`AssetStore`] implementation.
//!
//! Talks to the image host's HTTP API with `reqwest`. Upload and destroy
//! requests are authenticated with an SHA-256 signature over the sorted
//! request parameters plus the API secret.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use super::{AssetStore, StorageError, UploadedAsset};
use crate::config::StorageConfig;

const API_BASE: &str = "https://api.cloudinary.com/v1_1";

pub struct CloudinaryStore {
    config: StorageConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

impl CloudinaryStore {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn cloud_name(&self) -> &str {
        self.config.cloud_name.as_deref().unwrap_or_default()
    }

    fn api_key(&self) -> &str {
        self.config.api_key.as_deref().unwrap_or_default()
    }

    /// Sign `params` (already sorted `key=value` pairs) with the API secret.
    fn sign(&self, params: &[(&str, &str)]) -> String {
        let secret = self.config.api_secret.as_deref().unwrap_or_default();
        let to_sign: Vec<String> = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();

        let mut hasher = Sha256::new();
        hasher.update(to_sign.join("&").as_bytes());
        hasher.update(secret.as_bytes());
        hex::encode(hasher.finalize())
    }

    async fn check<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, StorageError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl AssetStore for CloudinaryStore {
    async fn upload(
        &self,
        file_stem: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<UploadedAsset, StorageError> {
        let public_id = format!("{}/{}", self.config.folder, file_stem);
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = self.sign(&[
            ("public_id", &public_id),
            ("timestamp", &timestamp),
        ]);

        let file_part = reqwest::multipart::Part::bytes(data.to_vec())
            .file_name(file_stem.to_string())
            .mime_str(content_type)
            .map_err(StorageError::Http)?;

        let form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("public_id", public_id)
            .text("timestamp", timestamp)
            .text("api_key", self.api_key().to_string())
            .text("signature", signature);

        let url = format!("{}/{}/image/upload", API_BASE, self.cloud_name());
        let response = self.client.post(&url).multipart(form).send().await?;
        let uploaded: UploadResponse = Self::check(response).await?;

        Ok(UploadedAsset {
            url: uploaded.secure_url,
            public_id: uploaded.public_id,
        })
    }

    async fn delete(&self, public_id: &str) -> Result<(), StorageError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = self.sign(&[
            ("public_id", public_id),
            ("timestamp", &timestamp),
        ]);

        let url = format!("{}/{}/image/destroy", API_BASE, self.cloud_name());
        let response = self
            .client
            .post(&url)
            .form(&[
                ("public_id", public_id),
                ("timestamp", &timestamp),
                ("api_key", self.api_key()),
                ("signature", &signature),
            ])
            .send()
            .await?;

        let destroyed: DestroyResponse = Self::check(response).await?;

        // "not found" means the asset is already gone, which is what we want
        match destroyed.result.as_str() {
            "ok" | "not found" => Ok(()),
            other => Err(StorageError::Rejected {
                status: 200,
                body: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> CloudinaryStore {
        CloudinaryStore::new(StorageConfig {
            cloud_name: Some("demo".to_string()),
            api_key: Some("key".to_string()),
            api_secret: Some("secret".to_string()),
            folder: "atelier".to_string(),
            allowed_formats: vec!["png".to_string()],
        })
    }

    #[test]
    fn test_signature_is_deterministic() {
        let store = test_store();
        let a = store.sign(&[("public_id", "atelier/x"), ("timestamp", "1700000000")]);
        let b = store.sign(&[("public_id", "atelier/x"), ("timestamp", "1700000000")]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64); // hex-encoded SHA-256
    }

    #[test]
    fn test_signature_depends_on_params() {
        let store = test_store();
        let a = store.sign(&[("public_id", "atelier/x"), ("timestamp", "1700000000")]);
        let b = store.sign(&[("public_id", "atelier/y"), ("timestamp", "1700000000")]);
        assert_ne!(a, b);
    }
}
