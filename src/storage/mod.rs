//! Object storage for uploaded images.
//!
//! [`ObjectStorage`] pairs an `object_store` backend with the public base URL
//! under which stored objects are reachable.

use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

use crate::config::{StorageBackend, StorageConfig};
use crate::upload::UploadFile;

pub mod keys;

pub use keys::{object_key, sanitize_name, sanitize_prefix};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("URL is not served by this storage: {0}")]
    ForeignUrl(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl StorageError {
    /// Short machine-readable code, surfaced to upload callers.
    pub fn code(&self) -> &'static str {
        match self {
            StorageError::UploadFailed(_) => "storage/upload-failed",
            StorageError::DownloadFailed(_) => "storage/download-failed",
            StorageError::DeleteFailed(_) => "storage/delete-failed",
            StorageError::NotFound(_) => "storage/object-not-found",
            StorageError::InvalidKey(_) => "storage/invalid-key",
            StorageError::ForeignUrl(_) => "storage/foreign-url",
            StorageError::BackendError(_) => "storage/unknown",
            StorageError::ConfigError(_) => "storage/misconfigured",
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Where an uploaded object ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredObject {
    pub url: String,
    pub path: String,
}

#[derive(Clone)]
pub struct ObjectStorage {
    store: Arc<dyn ObjectStore>,
    base_url: String,
    backend: StorageBackend,
}

impl std::fmt::Debug for ObjectStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStorage")
            .field("backend", &self.backend)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ObjectStorage {
    pub fn new(store: Arc<dyn ObjectStore>, base_url: impl Into<String>, backend: StorageBackend) -> Self {
        Self {
            store,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            backend,
        }
    }

    /// Volatile storage, for tests and throwaway instances.
    pub fn memory(base_url: impl Into<String>) -> Self {
        Self::new(Arc::new(InMemory::new()), base_url, StorageBackend::Memory)
    }

    pub async fn from_config(config: &StorageConfig) -> StorageResult<Self> {
        match config.backend {
            StorageBackend::Memory => Ok(Self::memory(config.public_base_url.clone())),
            StorageBackend::Local => {
                tokio::fs::create_dir_all(&config.local_root).await.map_err(|e| {
                    StorageError::ConfigError(format!(
                        "Failed to create storage directory {}: {}",
                        config.local_root.display(),
                        e
                    ))
                })?;
                let store = LocalFileSystem::new_with_prefix(&config.local_root)
                    .map_err(|e| StorageError::ConfigError(e.to_string()))?;
                Ok(Self::new(Arc::new(store), config.public_base_url.clone(), StorageBackend::Local))
            }
            StorageBackend::S3 => {
                let bucket = config
                    .bucket
                    .clone()
                    .ok_or_else(|| StorageError::ConfigError("STORAGE_BUCKET is required for S3".to_string()))?;
                let region = config.region.clone().unwrap_or_else(|| "us-east-1".to_string());

                let mut builder = AmazonS3Builder::from_env()
                    .with_region(region.clone())
                    .with_bucket_name(bucket.clone());
                if let Some(endpoint) = &config.endpoint {
                    builder = builder
                        .with_endpoint(endpoint.clone())
                        .with_allow_http(endpoint.starts_with("http://"));
                }
                let store = builder
                    .build()
                    .map_err(|e| StorageError::ConfigError(e.to_string()))?;

                let base_url = if config.public_base_url.is_empty() {
                    match &config.endpoint {
                        Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), bucket),
                        None => format!("https://{}.s3.{}.amazonaws.com", bucket, region),
                    }
                } else {
                    config.public_base_url.clone()
                };
                Ok(Self::new(Arc::new(store), base_url, StorageBackend::S3))
            }
        }
    }

    pub fn backend(&self) -> &StorageBackend {
        &self.backend
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Storage path of a URL produced by [`ObjectStorage::public_url`].
    pub fn path_from_url(&self, url: &str) -> Option<String> {
        let rest = url.strip_prefix(&self.base_url)?.strip_prefix('/')?;
        let rest = rest.split(['?', '#']).next().unwrap_or(rest);
        if rest.is_empty() {
            None
        } else {
            Some(rest.to_string())
        }
    }

    fn location(path: &str) -> StorageResult<Path> {
        Path::parse(path).map_err(|e| StorageError::InvalidKey(e.to_string()))
    }

    pub async fn put(&self, prefix: &str, file: &UploadFile) -> StorageResult<StoredObject> {
        let key = object_key(prefix, &file.name);
        let location = Self::location(&key)?;
        let size = file.bytes.len();
        let start = Instant::now();

        self.store
            .put(&location, PutPayload::from(file.bytes.clone()))
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    key = %key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Storage upload failed"
                );
                StorageError::UploadFailed(e.to_string())
            })?;

        let url = self.public_url(&key);
        tracing::info!(
            key = %key,
            size_bytes = size,
            content_type = %file.content_type,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Storage upload successful"
        );
        Ok(StoredObject { url, path: key })
    }

    pub async fn get(&self, path: &str) -> StorageResult<Bytes> {
        let location = Self::location(path)?;
        let result = self.store.get(&location).await.map_err(|e| match e {
            object_store::Error::NotFound { .. } => StorageError::NotFound(path.to_string()),
            other => StorageError::DownloadFailed(other.to_string()),
        })?;
        result
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))
    }

    pub async fn delete(&self, path: &str) -> StorageResult<()> {
        let location = Self::location(path)?;
        self.store.delete(&location).await.map_err(|e| match e {
            object_store::Error::NotFound { .. } => StorageError::NotFound(path.to_string()),
            other => StorageError::DeleteFailed(other.to_string()),
        })?;
        tracing::info!(key = %path, "Storage object deleted");
        Ok(())
    }

    /// Delete the object behind a public URL. URLs from elsewhere are refused.
    pub async fn delete_url(&self, url: &str) -> StorageResult<()> {
        let path = self
            .path_from_url(url)
            .ok_or_else(|| StorageError::ForeignUrl(url.to_string()))?;
        self.delete(&path).await
    }

    /// Round-trip health check. A missing marker object still proves the backend answers.
    pub async fn check(&self) -> StorageResult<()> {
        let marker = Path::from(".health");
        match self.store.head(&marker).await {
            Ok(_) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn png(name: &str) -> UploadFile {
        UploadFile::new(name, "image/png", Bytes::from_static(b"\x89PNG\r\n\x1a\n"))
    }

    #[tokio::test]
    async fn put_get_delete_round_trip() {
        let storage = ObjectStorage::memory("http://localhost:3000/media/");
        let stored = storage.put("news", &png("cover art.png")).await.unwrap();

        assert!(stored.path.starts_with("news/"));
        assert!(stored.path.ends_with("_cover_art.png"));
        assert_eq!(stored.url, format!("http://localhost:3000/media/{}", stored.path));

        assert_eq!(storage.get(&stored.path).await.unwrap().len(), 8);
        storage.delete_url(&stored.url).await.unwrap();
        assert!(matches!(storage.get(&stored.path).await, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn foreign_urls_are_refused() {
        let storage = ObjectStorage::memory("http://localhost:3000/media");
        let err = storage.delete_url("https://elsewhere.example/img.png").await.unwrap_err();
        assert!(matches!(err, StorageError::ForeignUrl(_)));
        assert_eq!(storage.path_from_url("http://localhost:3000/media"), None);
    }

    #[tokio::test]
    async fn local_backend_writes_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            backend: StorageBackend::Local,
            local_root: PathBuf::from(dir.path()),
            public_base_url: "http://localhost:3000/media".to_string(),
            bucket: None,
            region: None,
            endpoint: None,
        };
        let storage = ObjectStorage::from_config(&config).await.unwrap();
        storage.check().await.unwrap();

        let stored = storage.put("board", &png("portrait.png")).await.unwrap();
        assert!(dir.path().join(&stored.path).exists());
    }

    #[tokio::test]
    async fn s3_requires_bucket() {
        let config = StorageConfig {
            backend: StorageBackend::S3,
            local_root: PathBuf::from("unused"),
            public_base_url: String::new(),
            bucket: None,
            region: None,
            endpoint: None,
        };
        assert!(matches!(
            ObjectStorage::from_config(&config).await,
            Err(StorageError::ConfigError(_))
        ));
    }
}
