use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::content::Collection;
use crate::error::ApiError;
use crate::handlers::multipart::extract_upload_file;
use crate::middleware::{ApiResponse, ApiResult, CurrentSession};
use crate::state::AppState;
use crate::storage::sanitize_prefix;
use crate::upload::{data_uri, FallbackMode, StorageTransport, UploadAdapter, UploadOutcome, UploadPolicy};

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    pub url: String,
}

fn raw_error(err: ApiError) -> Response {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({ "error": err.message() }))).into_response()
}

/// Ceiling for a storage prefix: the collection's when the first segment names one.
fn policy_for_prefix(prefix: &str, state: &AppState) -> UploadPolicy {
    let first = prefix.split('/').next().unwrap_or_default();
    match Collection::from_managed(first) {
        Some(collection) => UploadPolicy::for_collection(collection, &state.config.upload),
        None => UploadPolicy::images(state.config.upload.image_max_bytes),
    }
}

/// POST /api/storage/upload?path=... - Durable transfer endpoint.
///
/// Answers `{url, path}` on success and `{error}` with a non-2xx status
/// otherwise. Never falls back; the caller decides what to do on failure.
pub async fn upload(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Query(query): Query<UploadQuery>,
    multipart: Multipart,
) -> Response {
    let file = match extract_upload_file(multipart).await {
        Ok(file) => file,
        Err(e) => return raw_error(e),
    };

    let prefix = sanitize_prefix(query.path.as_deref().unwrap_or_default());
    let policy = policy_for_prefix(&prefix, &state);
    let adapter = UploadAdapter::new(
        Arc::new(StorageTransport::new(state.storage.clone())),
        FallbackMode::Disabled,
    );

    match adapter
        .upload(file.as_ref(), &prefix, Some(&current.subject), &policy)
        .await
    {
        UploadOutcome::Succeeded { url, storage_path, .. } => {
            (StatusCode::OK, Json(json!({ "url": url, "path": storage_path }))).into_response()
        }
        UploadOutcome::Rejected { reason } => raw_error(reason.into()),
    }
}

/// DELETE /api/storage?url=... - Delete a stored object by its public URL
pub async fn delete(State(state): State<AppState>, Query(query): Query<DeleteQuery>) -> ApiResult<serde_json::Value> {
    if data_uri::is_data_uri(&query.url) {
        return Ok(ApiResponse::success(json!({ "deleted": false, "reason": "inline image" })));
    }
    state.storage.delete_url(&query.url).await?;
    Ok(ApiResponse::success(json!({ "deleted": true })))
}

/// GET /api/storage/health - Storage re-check for the admin panel
pub async fn health(State(state): State<AppState>) -> ApiResult<serde_json::Value> {
    state.storage.check().await?;
    Ok(ApiResponse::success(json!({
        "status": "ok",
        "backend": state.storage.backend(),
        "base_url": state.storage.base_url(),
    })))
}
