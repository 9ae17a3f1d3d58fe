use axum::extract::{rejection::JsonRejection, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::session_cookie;
use crate::error::ApiError;
use crate::identity::Subject;
use crate::middleware::{ApiResponse, ApiResult};
use crate::session::IDLE_WINDOW;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub session: Uuid,
    pub subject: Subject,
    pub expires_at: DateTime<Utc>,
    pub idle_window_ms: u64,
    pub redirect: String,
}

/// POST /auth/login - Sign in and receive the session cookie
pub async fn post(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<LoginResponse> {
    let Json(request) = payload?;
    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(ApiError::validation_error("Email and password are required", None));
    }

    let signed_in = state.identity.sign_in(&request.email, &request.password).await?;

    let session = &state.config.session;
    let max_age = (signed_in.expires_at - Utc::now()).num_seconds().max(0);
    let cookie = session_cookie(&session.cookie_name, &signed_in.token, session.cookie_secure, max_age);

    Ok(ApiResponse::success(LoginResponse {
        session: signed_in.session,
        subject: signed_in.subject,
        expires_at: signed_in.expires_at,
        idle_window_ms: IDLE_WINDOW.as_millis() as u64,
        redirect: "/admin".to_string(),
    })
    .with_cookie(cookie))
}
