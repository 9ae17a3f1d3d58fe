use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};

use crate::error::ApiError;
use crate::state::AppState;
use crate::upload::content_type_from_name;

/// GET /media/*path - Serve an object from the configured storage
pub async fn get(State(state): State<AppState>, Path(path): Path<String>) -> Result<impl IntoResponse, ApiError> {
    let bytes = state.storage.get(&path).await?;
    Ok((
        [(header::CONTENT_TYPE, content_type_from_name(&path))],
        bytes,
    ))
}
