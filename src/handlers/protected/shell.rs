use axum::{
    response::{Html, IntoResponse, Redirect, Response},
    Extension,
};

use crate::content::Collection;
use crate::middleware::CurrentSession;

/// GET /admin - Admin shell for a signed-in session
pub async fn admin_page(Extension(current): Extension<CurrentSession>) -> Html<String> {
    let collections: Vec<String> = Collection::MANAGED
        .iter()
        .map(|c| format!(r#"<li><a href="/api/admin/{0}">{0}</a></li>"#, c))
        .collect();

    Html(format!(
        r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>Admin</title></head>
<body data-session-events="/api/session/events" data-session-extend="/api/session/extend">
<header>Signed in as {email} <span id="session-indicator"></span></header>
<nav><ul>{collections}</ul></nav>
</body>
</html>"#,
        email = html_escape(&current.subject.email),
        collections = collections.join(""),
    ))
}

/// GET /admin/login - Login view. Signed-in sessions go straight to the shell.
pub async fn login_page(current: Option<Extension<CurrentSession>>) -> Response {
    if current.is_some() {
        return Redirect::to("/admin").into_response();
    }
    Html(
        r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>Sign in</title></head>
<body>
<form data-endpoint="/auth/login" method="post">
<input name="email" type="email" required>
<input name="password" type="password" required>
<button type="submit">Sign in</button>
</form>
</body>
</html>"#,
    )
    .into_response()
}

fn html_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
