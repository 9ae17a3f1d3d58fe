use axum::extract::Multipart;

use crate::error::ApiError;
use crate::upload::UploadFile;

/// The single `file` field of a multipart body. `None` when no file was sent.
pub async fn extract_upload_file(mut multipart: Multipart) -> Result<Option<UploadFile>, ApiError> {
    let mut file: Option<UploadFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to read multipart: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        if file.is_some() {
            return Err(ApiError::bad_request(
                "Multiple file fields are not allowed; send exactly one field named 'file'",
            ));
        }

        let name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read file data: {}", e)))?;

        file = Some(UploadFile::new(name, content_type, bytes));
    }

    Ok(file)
}
