//! Image uploads: validate, send through the primary transport, and fall
//! back to an inline data URI when the primary path fails.

use bytes::Bytes;

pub mod adapter;
pub mod data_uri;
pub mod policy;
pub mod transport;

pub use adapter::{
    FallbackMode, Transport, UploadAdapter, UploadAttempt, UploadOutcome, UploadRejection, UploadState,
    FALLBACK_WARNING,
};
pub use policy::{AllowedTypes, InvalidFile, UploadPolicy};
pub use transport::{HttpTransport, PrimaryTransport, StorageTransport, TransportError};

/// A file selected for upload, fully buffered.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// MIME type from a file extension, for files read from disk or storage.
pub fn content_type_from_name(name: &str) -> &'static str {
    let extension = name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",
        Some("svg") => "image/svg+xml",
        Some("bmp") => "image/bmp",
        Some("ico") => "image/x-icon",
        _ => "application/octet-stream",
    }
}
