use std::fmt;

use crate::config::UploadConfig;
use crate::content::Collection;

use super::UploadFile;

const MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedTypes {
    /// Any `image/*` type.
    AnyImage,
    /// Only these exact MIME types.
    Only(Vec<String>),
}

impl AllowedTypes {
    pub fn permits(&self, content_type: &str) -> bool {
        let content_type = essence(content_type);
        match self {
            AllowedTypes::AnyImage => content_type.starts_with("image/") && content_type.len() > "image/".len(),
            AllowedTypes::Only(types) => types.iter().any(|t| t.eq_ignore_ascii_case(&content_type)),
        }
    }
}

/// Why a file was refused before any transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidFile {
    Missing,
    Empty,
    Type { content_type: String },
    Size { size: usize, max_bytes: usize },
}

impl InvalidFile {
    pub fn code(&self) -> &'static str {
        match self {
            InvalidFile::Missing => "FILE_MISSING",
            InvalidFile::Empty => "FILE_EMPTY",
            InvalidFile::Type { .. } => "FILE_TYPE",
            InvalidFile::Size { .. } => "FILE_TOO_LARGE",
        }
    }
}

impl fmt::Display for InvalidFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidFile::Missing => write!(f, "No file was selected"),
            InvalidFile::Empty => write!(f, "The selected file is empty"),
            InvalidFile::Type { content_type } => {
                write!(f, "Only image files can be uploaded (got '{}')", content_type)
            }
            InvalidFile::Size { size, max_bytes } => write!(
                f,
                "File is too large ({:.1} MB). Maximum size is {} MB",
                *size as f64 / MB,
                format_megabytes(*max_bytes)
            ),
        }
    }
}

fn format_megabytes(bytes: usize) -> String {
    let mb = bytes as f64 / MB;
    if mb.fract() == 0.0 {
        format!("{}", mb as u64)
    } else {
        format!("{:.1}", mb)
    }
}

/// Lowercased MIME type without parameters.
pub(crate) fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// Caller-chosen limits for one upload call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    pub max_bytes: usize,
    pub allowed: AllowedTypes,
}

impl UploadPolicy {
    pub fn images(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            allowed: AllowedTypes::AnyImage,
        }
    }

    pub fn with_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed = AllowedTypes::Only(types.into_iter().map(Into::into).collect());
        self
    }

    /// Ceiling for images attached to records of `collection`.
    pub fn for_collection(collection: Collection, config: &UploadConfig) -> Self {
        Self::images(collection.upload_ceiling(config))
    }

    /// Presence, then type, then size.
    pub fn check_file(&self, file: Option<&UploadFile>) -> Result<(), InvalidFile> {
        let file = Self::check_present(file)?;
        self.check_content(file)
    }

    pub(crate) fn check_present(file: Option<&UploadFile>) -> Result<&UploadFile, InvalidFile> {
        let file = file.ok_or(InvalidFile::Missing)?;
        if file.is_empty() {
            return Err(InvalidFile::Empty);
        }
        Ok(file)
    }

    pub(crate) fn check_content(&self, file: &UploadFile) -> Result<(), InvalidFile> {
        if !self.allowed.permits(&file.content_type) {
            return Err(InvalidFile::Type {
                content_type: file.content_type.clone(),
            });
        }
        if file.size() > self.max_bytes {
            return Err(InvalidFile::Size {
                size: file.size(),
                max_bytes: self.max_bytes,
            });
        }
        Ok(())
    }
}
