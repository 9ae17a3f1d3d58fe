use axum::{extract::Request, middleware::Next, response::IntoResponse, response::Response};

use crate::error::ApiError;
use crate::identity::authorize_admin;

use super::gate::CurrentSession;

/// Admin data routes require an authorized subject.
pub async fn require_admin(request: Request, next: Next) -> Response {
    let allowed = request
        .extensions()
        .get::<CurrentSession>()
        .map(|current| authorize_admin(&current.subject));

    match allowed {
        Some(true) => next.run(request).await,
        Some(false) => ApiError::forbidden("Admin access required").into_response(),
        None => ApiError::unauthorized("Authentication required").into_response(),
    }
}

/// Every request to an admin data route counts as activity.
pub async fn track_activity(request: Request, next: Next) -> Response {
    if let Some(current) = request.extensions().get::<CurrentSession>() {
        current.context.touch();
        tracing::trace!(session = %current.session, "Activity recorded");
    }
    next.run(request).await
}
