use axum::extract::{rejection::JsonRejection, State};
use axum::Json;
use serde_json::{Map, Value};

use crate::content::{contact, validate_fields, Collection, ContactMessage, ContactSubmission};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// POST /api/contact - Store a contact form message
pub async fn post(
    State(state): State<AppState>,
    payload: Result<Json<ContactSubmission>, JsonRejection>,
) -> ApiResult<ContactMessage> {
    let Json(submission) = payload?;

    let mut fields = Map::new();
    fields.insert("name".into(), Value::String(submission.name.clone()));
    fields.insert("email".into(), Value::String(submission.email.clone()));
    fields.insert("message".into(), Value::String(submission.message.clone()));
    validate_fields(Collection::Contact, &fields, false)
        .map_err(|errors| ApiError::validation_error("Please check the highlighted fields", Some(errors)))?;

    match contact::submit(state.store.as_ref(), submission).await {
        Some(message) => Ok(ApiResponse::created(message)),
        None => Err(ApiError::service_unavailable(
            "Your message could not be sent right now, please try again later",
        )),
    }
}
