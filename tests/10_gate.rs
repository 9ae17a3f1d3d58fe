mod common;

use axum::http::{header, StatusCode};
use common::{body_json, get, json_request, request, TestApp};
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn signed_out_page_redirects_to_login() {
    let app = TestApp::new().await;

    let res = app.send(get("/admin", None)).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(res.headers()[header::LOCATION], "/admin/login");
}

#[tokio::test]
async fn signed_out_api_call_gets_401_with_redirect_hint() {
    let app = TestApp::new().await;

    let res = app.send(get("/api/admin/news", None)).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(res).await;
    assert_eq!(body["code"], "UNAUTHORIZED");
    assert_eq!(body["redirect"], "/admin/login");
}

#[tokio::test]
async fn login_view_does_not_loop() {
    let app = TestApp::new().await;

    let res = app.send(get("/admin/login", None)).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = app.send(get("/admin/login?next=%2Fadmin", None)).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn signed_in_session_reaches_the_shell() {
    let app = TestApp::new().await;
    let cookie = app.login().await;

    let res = app.send(get("/admin", Some(&cookie))).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = app.send(get("/admin/login", Some(&cookie))).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(res.headers()[header::LOCATION], "/admin");
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let app = TestApp::new().await;
    let body = json!({ "email": common::ADMIN_EMAIL, "password": "not the password" });

    let res = app.send(json_request("POST", "/auth/login", None, &body)).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(common::set_cookie(&res).is_none());
}

#[tokio::test]
async fn stale_cookie_is_cleared() {
    let app = TestApp::new().await;

    let res = app.send(get("/admin", Some("cms_session=not-a-token"))).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    let cleared = res.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(cleared.starts_with("cms_session=;"), "unexpected cookie: {}", cleared);
    assert!(cleared.contains("Max-Age=0"));
}

#[tokio::test]
async fn stale_cookie_is_cleared_on_login_view() {
    let app = TestApp::new().await;

    let res = app.send(get("/admin/login", Some("cms_session=not-a-token"))).await;
    assert_eq!(res.status(), StatusCode::OK);
    let cleared = res.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(cleared.starts_with("cms_session=;"), "unexpected cookie: {}", cleared);
    assert!(cleared.contains("Max-Age=0"));

    let res = app.send(get("/admin/login", None)).await;
    assert!(res.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn idle_session_is_signed_out() {
    let app = TestApp::new().await;
    let cookie = app.login().await;

    let res = app.send(get("/api/session", Some(&cookie))).await;
    assert_eq!(res.status(), StatusCode::OK);

    app.clock.advance(Duration::from_secs(10 * 60 + 1));

    let res = app.send(get("/api/session", Some(&cookie))).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn explicit_sign_out_ends_the_session() {
    let app = TestApp::new().await;
    let cookie = app.login().await;

    let res = app.send(request("DELETE", "/api/session", Some(&cookie), axum::body::Body::empty())).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["data"]["signed_out"], true);

    let res = app.send(get("/admin", Some(&cookie))).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
}
