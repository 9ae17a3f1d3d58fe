use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Redirect, Response},
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{clear_session_cookie, cookie_value};
use crate::identity::{AuthState, GateView, IdentityGate, Subject};
use crate::session::SessionContext;
use crate::state::AppState;

/// Signed-in session attached to gated requests.
#[derive(Clone, Debug)]
pub struct CurrentSession {
    pub session: Uuid,
    pub subject: Subject,
    pub context: Arc<SessionContext>,
}

/// Session cookie value, if the request carries one.
pub fn session_token<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|value| cookie_value(value, cookie_name))
}

/// Identity gate for protected routes: forward signed-in requests with a
/// [`CurrentSession`], send everyone else to the login view.
pub async fn identity_gate(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let cookie_name = &state.config.session.cookie_name;
    let token = session_token(request.headers(), cookie_name).map(str::to_string);

    let auth = match &token {
        Some(token) => state.identity.resolve(token).await,
        None => AuthState::SignedOut,
    };
    let session = match &auth {
        AuthState::SignedIn { session, .. } => Some(*session),
        AuthState::SignedOut => None,
    };

    let mut gate = IdentityGate::new(state.config.session.login_path.clone());
    gate.observe(auth);

    match gate.view(&path) {
        GateView::Render(subject) => {
            let context = session.and_then(|session| state.identity.session_context(session).map(|c| (session, c)));
            let Some((session, context)) = context else {
                // Signed out between resolve and lookup.
                return redirect_to_login(&state, &path, token.is_some());
            };
            tracing::debug!(session = %session, subject = %subject.email, path = %path, "Gate passed");
            request.extensions_mut().insert(CurrentSession {
                session,
                subject,
                context,
            });
            next.run(request).await
        }
        GateView::Nothing => {
            let mut response = next.run(request).await;
            if token.is_some() {
                clear_stale_cookie(&state, &mut response);
            }
            response
        }
        GateView::Loading | GateView::Redirect(_) => redirect_to_login(&state, &path, token.is_some()),
    }
}

/// `303` to the login view for pages, `401` with a `redirect` hint for API calls.
/// A stale cookie is cleared either way.
fn redirect_to_login(state: &AppState, path: &str, had_cookie: bool) -> Response {
    let login_path = &state.config.session.login_path;
    tracing::debug!(path = %path, "Gate redirecting to login");

    let mut response = if path.starts_with("/api/") {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": true,
                "message": "Authentication required",
                "code": "UNAUTHORIZED",
                "redirect": login_path,
            })),
        )
            .into_response()
    } else {
        Redirect::to(login_path).into_response()
    };

    if had_cookie {
        clear_stale_cookie(state, &mut response);
    }
    response
}

fn clear_stale_cookie(state: &AppState, response: &mut Response) {
    let cookie = clear_session_cookie(&state.config.session.cookie_name, state.config.session.cookie_secure);
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
}
