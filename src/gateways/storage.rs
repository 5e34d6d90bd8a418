use serde::Deserialize;
use uuid::Uuid;

use crate::config::StorageConfig;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object storage is not configured")]
    NotConfigured,
    #[error("{0}")]
    InvalidInput(String),
    #[error("request to object storage failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("object storage responded with {status}: {message}")]
    Rejected { status: u16, message: String },
}

#[derive(Debug, Deserialize)]
struct StorageErrorBody {
    #[serde(alias = "error")]
    message: String,
}

/// Client for a bucket-based object store that serves uploads under a
/// public URL.
#[derive(Debug, Clone)]
pub struct ObjectStorage {
    client: reqwest::Client,
    base_url: Option<String>,
    api_key: Option<String>,
    bucket: String,
}

impl ObjectStorage {
    pub fn from_config(config: &StorageConfig) -> Self {
        if config.base_url.is_none() {
            log::warn!("STORAGE_URL is not set, image uploads are disabled");
        }
        ObjectStorage {
            client: reqwest::Client::new(),
            base_url: config
                .base_url
                .as_ref()
                .map(|u| u.trim_end_matches('/').to_string()),
            api_key: config.api_key.clone(),
            bucket: config.bucket.clone(),
        }
    }

    fn base_url(&self) -> Result<&str, StorageError> {
        self.base_url.as_deref().ok_or(StorageError::NotConfigured)
    }

    pub fn public_url(&self, path: &str) -> Result<String, StorageError> {
        Ok(format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url()?,
            self.bucket,
            path
        ))
    }

    /// Uploads `bytes` under `path` and returns the public URL.
    pub async fn upload(
        &self,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError> {
        if bytes.is_empty() {
            return Err(StorageError::InvalidInput("upload body is empty".to_string()));
        }
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url()?,
            self.bucket,
            path
        );

        let mut request = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "true")
            .body(bytes);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<StorageErrorBody>().await {
                Ok(body) => body.message,
                Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
            };
            return Err(StorageError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        log::info!("Stored object {} in bucket {}", path, self.bucket);
        self.public_url(path)
    }
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    let mime = content_type.split(';').next().unwrap_or("").trim();
    match mime.to_ascii_lowercase().as_str() {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

/// Object key for a new event image, e.g. `events/12/<uuid>.png`.
pub fn event_image_path(event_id: i64, content_type: &str) -> Result<String, StorageError> {
    let ext = extension_for(content_type).ok_or_else(|| {
        StorageError::InvalidInput(format!(
            "Unsupported image type: {}. Supported: png, jpeg, webp, gif",
            content_type
        ))
    })?;
    Ok(format!("events/{}/{}.{}", event_id, Uuid::new_v4(), ext))
}
