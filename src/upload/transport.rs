use async_trait::async_trait;
use reqwest::header::COOKIE;
use serde::Deserialize;
use thiserror::Error;

use crate::storage::{ObjectStorage, StoredObject};

use super::UploadFile;

/// Failure of the primary transfer path, with a provider code when one is known.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} ({code})")]
pub struct TransportError {
    pub code: String,
    pub message: String,
}

impl TransportError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Durable transfer of one file under a storage prefix.
#[async_trait]
pub trait PrimaryTransport: Send + Sync {
    async fn transfer(&self, file: &UploadFile, prefix: &str) -> Result<StoredObject, TransportError>;

    fn name(&self) -> &'static str;
}

/// Writes straight into the configured object storage.
#[derive(Debug, Clone)]
pub struct StorageTransport {
    storage: ObjectStorage,
}

impl StorageTransport {
    pub fn new(storage: ObjectStorage) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl PrimaryTransport for StorageTransport {
    async fn transfer(&self, file: &UploadFile, prefix: &str) -> Result<StoredObject, TransportError> {
        self.storage
            .put(prefix, file)
            .await
            .map_err(|e| TransportError::new(e.code(), e.to_string()))
    }

    fn name(&self) -> &'static str {
        "storage"
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
    #[serde(default)]
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadErrorResponse {
    error: String,
}

/// Posts the file to the server's storage endpoint, authenticated by a session cookie.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    cookie: Option<String>,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cookie: None,
        }
    }

    /// `Cookie` header value sent with each transfer.
    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = Some(cookie.into());
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}/api/storage/upload", self.base_url)
    }
}

#[async_trait]
impl PrimaryTransport for HttpTransport {
    async fn transfer(&self, file: &UploadFile, prefix: &str) -> Result<StoredObject, TransportError> {
        let part = reqwest::multipart::Part::bytes(file.bytes.to_vec())
            .file_name(file.name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| TransportError::new("client/invalid-mime", e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let mut request = self
            .client
            .post(self.endpoint())
            .query(&[("path", prefix)])
            .multipart(form);
        if let Some(cookie) = &self.cookie {
            request = request.header(COOKIE, cookie);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::new("network", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<UploadErrorResponse>().await {
                Ok(body) => body.error,
                Err(_) => status.canonical_reason().unwrap_or("Unknown error").to_string(),
            };
            return Err(TransportError::new(format!("http/{}", status.as_u16()), message));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| TransportError::new("invalid-response", e.to_string()))?;
        let path = body.path.unwrap_or_default();
        Ok(StoredObject { url: body.url, path })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
