use axum::{
    extract::{rejection::JsonRejection, Multipart, Path, State},
    Extension, Json,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::content::{self, slugify, validate_fields, Collection};
use crate::error::ApiError;
use crate::handlers::multipart::extract_upload_file;
use crate::middleware::{ApiResponse, ApiResult, CurrentSession};
use crate::state::AppState;
use crate::upload::{data_uri, Transport, UploadOutcome, UploadPolicy};

fn managed(name: &str) -> Result<Collection, ApiError> {
    Collection::from_managed(name).ok_or_else(|| ApiError::not_found(format!("Unknown collection '{}'", name)))
}

fn body(payload: Result<Json<Value>, JsonRejection>) -> Result<Map<String, Value>, ApiError> {
    match payload? {
        Json(Value::Object(map)) => Ok(map),
        Json(_) => Err(ApiError::invalid_json("Request body must be a JSON object")),
    }
}

/// Fill fields the admin forms leave to the server.
fn with_defaults(collection: Collection, mut data: Map<String, Value>) -> Map<String, Value> {
    match collection {
        Collection::News => {
            let missing_slug = data.get("slug").and_then(Value::as_str).map_or(true, str::is_empty);
            if missing_slug {
                if let Some(title) = data.get("title").and_then(Value::as_str) {
                    let slug = slugify(title);
                    data.insert("slug".into(), Value::String(slug));
                }
            }
            data.entry("published").or_insert(Value::Bool(true));
        }
        Collection::Contact => {
            data.entry("created_at").or_insert_with(|| json!(Utc::now()));
            data.entry("read").or_insert(Value::Bool(false));
        }
        _ => {}
    }
    data
}

/// GET /api/admin/:collection - All records, in the collection's display order
pub async fn list(State(state): State<AppState>, Path(name): Path<String>) -> ApiResult<Vec<Value>> {
    let collection = managed(&name)?;
    let docs = content::list_documents(state.store.as_ref(), collection, collection.default_query()).await;
    Ok(ApiResponse::success(docs.into_iter().map(|d| d.into_value()).collect()))
}

/// POST /api/admin/:collection - Create a record
pub async fn create(
    State(state): State<AppState>,
    Path(name): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    let collection = managed(&name)?;
    let data = with_defaults(collection, body(payload)?);
    validate_fields(collection, &data, false)
        .map_err(|errors| ApiError::validation_error("Please check the highlighted fields", Some(errors)))?;

    content::create_document(state.store.as_ref(), collection, data)
        .await
        .map(|doc| ApiResponse::created(doc.into_value()))
        .ok_or_else(|| ApiError::service_unavailable("The record could not be saved, please try again"))
}

/// GET /api/admin/:collection/:id
pub async fn get(State(state): State<AppState>, Path((name, id)): Path<(String, String)>) -> ApiResult<Value> {
    let collection = managed(&name)?;
    content::get_document(state.store.as_ref(), collection, &id)
        .await
        .map(|doc| ApiResponse::success(doc.into_value()))
        .ok_or_else(|| ApiError::not_found(format!("No {} record '{}'", collection, id)))
}

/// PUT /api/admin/:collection/:id - Merge the given fields into the record
pub async fn update(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, String)>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    let collection = managed(&name)?;
    let data = body(payload)?;
    validate_fields(collection, &data, true)
        .map_err(|errors| ApiError::validation_error("Please check the highlighted fields", Some(errors)))?;

    let store = state.store.as_ref();
    if content::get_document(store, collection, &id).await.is_none() {
        return Err(ApiError::not_found(format!("No {} record '{}'", collection, id)));
    }
    content::update_document(store, collection, &id, data)
        .await
        .map(|doc| ApiResponse::success(doc.into_value()))
        .ok_or_else(|| ApiError::service_unavailable("The record could not be saved, please try again"))
}

/// DELETE /api/admin/:collection/:id - Remove the record and its stored image
pub async fn delete(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, String)>,
) -> ApiResult<Value> {
    let collection = managed(&name)?;
    let store = state.store.as_ref();
    let Some(doc) = content::get_document(store, collection, &id).await else {
        return Err(ApiError::not_found(format!("No {} record '{}'", collection, id)));
    };

    if !content::delete_document(store, collection, &id).await {
        return Err(ApiError::service_unavailable("The record could not be deleted, please try again"));
    }

    let image = collection
        .image_field()
        .and_then(|field| doc.data.get(field))
        .and_then(Value::as_str)
        .filter(|url| state.storage.path_from_url(url).is_some());
    if let Some(url) = image {
        if let Err(e) = state.storage.delete_url(url).await {
            tracing::warn!(collection = %collection, id = %id, url = %url, error = %e, "Orphaned image left in storage");
        }
    }

    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}

#[derive(Debug, Serialize)]
pub struct ImageUploadResponse {
    pub url: String,
    pub storage_path: Option<String>,
    pub transport: Transport,
    pub degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub record: Value,
}

/// POST /api/admin/:collection/:id/image - Upload an image and attach it to the record
pub async fn upload_image(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Path((name, id)): Path<(String, String)>,
    multipart: Multipart,
) -> ApiResult<ImageUploadResponse> {
    let collection = managed(&name)?;
    let field = collection
        .image_field()
        .ok_or_else(|| ApiError::bad_request(format!("{} records have no image", collection)))?;

    let store = state.store.as_ref();
    let Some(doc) = content::get_document(store, collection, &id).await else {
        return Err(ApiError::not_found(format!("No {} record '{}'", collection, id)));
    };

    let file = extract_upload_file(multipart).await?;
    let policy = UploadPolicy::for_collection(collection, &state.config.upload);
    let outcome = state
        .uploads
        .upload(file.as_ref(), collection.storage_prefix(), Some(&current.subject), &policy)
        .await;

    let (transport, url, storage_path, warning) = match outcome {
        UploadOutcome::Succeeded {
            transport,
            url,
            storage_path,
            warning,
        } => (transport, url, storage_path, warning),
        UploadOutcome::Rejected { reason } => return Err(reason.into()),
    };

    let previous = doc.data.get(field).and_then(Value::as_str).map(str::to_string);
    let mut patch = Map::new();
    patch.insert(field.to_string(), Value::String(url.clone()));
    let Some(updated) = content::update_document(store, collection, &id, patch).await else {
        return Err(ApiError::service_unavailable("The image was uploaded but could not be attached"));
    };

    // Replaced durable images are removed; inline ones have nothing to remove.
    if let Some(previous) = previous.filter(|p| !data_uri::is_data_uri(p) && *p != url) {
        if state.storage.path_from_url(&previous).is_some() {
            if let Err(e) = state.storage.delete_url(&previous).await {
                tracing::warn!(collection = %collection, id = %id, error = %e, "Previous image left in storage");
            }
        }
    }

    Ok(ApiResponse::success(ImageUploadResponse {
        degraded: transport == Transport::Fallback,
        url,
        storage_path,
        transport,
        warning,
        record: updated.into_value(),
    }))
}
