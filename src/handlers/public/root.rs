use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET / - Service descriptor
pub async fn get() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "association-cms",
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": {
                "content": "/api/news[/:slug], /api/press, /api/gallery, /api/board, /api/history (public)",
                "contact": "/api/contact (public)",
                "login": "/auth/login (public)",
                "admin": "/admin, /admin/login (session)",
                "session": "/api/session[/events|/extend|/activity] (session)",
                "data": "/api/admin/:collection[/:id[/image]] (session)",
                "storage": "/api/storage/upload, /api/storage (session)",
                "media": "/media/*path (public)",
            }
        }
    }))
}

/// GET /health - Database and storage liveness
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();
    let database = state.store.health_check().await;
    let storage = state.storage.check().await;

    let status = if database.is_ok() && storage.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let describe = |result: Result<(), String>| match result {
        Ok(()) => json!("ok"),
        Err(e) => json!({ "error": e }),
    };

    (
        status,
        Json(json!({
            "success": status == StatusCode::OK,
            "data": {
                "status": if status == StatusCode::OK { "ok" } else { "degraded" },
                "timestamp": now,
                "database": describe(database.map_err(|e| e.to_string())),
                "database_backend": state.store.backend_name(),
                "storage": describe(storage.map_err(|e| e.to_string())),
            }
        })),
    )
}
