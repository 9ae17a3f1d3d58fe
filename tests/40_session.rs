mod common;

use axum::body::Body;
use axum::http::StatusCode;
use common::{body_json, get, json_request, request, TestApp};
use http_body_util::BodyExt;
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn indicator_warns_in_the_last_two_minutes() {
    let app = TestApp::new().await;
    let cookie = app.login().await;

    let body = body_json(app.send(get("/api/session", Some(&cookie))).await).await;
    assert_eq!(body["data"]["indicator"]["state"], "normal");
    assert_eq!(body["data"]["idle_window_ms"], 600_000);

    app.clock.advance(Duration::from_secs(8 * 60 + 30));
    let body = body_json(app.send(get("/api/session", Some(&cookie))).await).await;
    assert_eq!(body["data"]["indicator"]["state"], "warning");
    assert_eq!(body["data"]["indicator"]["display"], "1:30");

    let res = app.send(request("POST", "/api/session/extend", Some(&cookie), Body::empty())).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["data"]["state"], "normal");
    assert_eq!(body["data"]["display"], "10:00");
}

#[tokio::test]
async fn admin_requests_count_as_activity() {
    let app = TestApp::new().await;
    let cookie = app.login().await;

    app.clock.advance(Duration::from_secs(9 * 60));
    let res = app.send(get("/api/admin/news", Some(&cookie))).await;
    assert_eq!(res.status(), StatusCode::OK);

    app.clock.advance(Duration::from_secs(9 * 60));
    let res = app.send(get("/api/session", Some(&cookie))).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn reported_interactions_reset_the_clock() {
    let app = TestApp::new().await;
    let cookie = app.login().await;

    app.clock.advance(Duration::from_secs(9 * 60));
    let res = app
        .send(json_request("POST", "/api/session/activity", Some(&cookie), &json!({"kind": "key_press"})))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["data"]["display"], "10:00");

    let res = app
        .send(json_request("POST", "/api/session/activity", Some(&cookie), &json!({"kind": "telepathy"})))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reading_the_session_is_not_activity() {
    let app = TestApp::new().await;
    let cookie = app.login().await;

    app.clock.advance(Duration::from_secs(6 * 60));
    app.send(get("/api/session", Some(&cookie))).await;
    app.clock.advance(Duration::from_secs(4 * 60 + 1));

    let res = app.send(get("/api/session", Some(&cookie))).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn event_stream_ends_after_sign_out() {
    let app = TestApp::new().await;
    let cookie = app.login().await;

    let res = app.send(get("/api/session/events", Some(&cookie))).await;
    assert_eq!(res.status(), StatusCode::OK);
    let mut body = res.into_body();

    let mut seen = String::new();
    while !(seen.contains("event: indicator") && seen.contains("event: auth")) {
        let frame = tokio::time::timeout(Duration::from_secs(5), body.frame())
            .await
            .expect("event in time")
            .expect("stream open")
            .expect("frame");
        if let Ok(data) = frame.into_data() {
            seen.push_str(&String::from_utf8_lossy(&data));
        }
    }
    assert!(seen.contains("\"status\":\"signed_in\""), "{}", seen);

    let res = app.send(request("DELETE", "/api/session", Some(&cookie), Body::empty())).await;
    assert_eq!(res.status(), StatusCode::OK);

    let mut tail = String::new();
    let ended = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(frame) = body.frame().await {
            if let Ok(data) = frame.expect("frame").into_data() {
                tail.push_str(&String::from_utf8_lossy(&data));
            }
        }
    })
    .await;
    assert!(ended.is_ok(), "stream did not end");
    assert!(tail.contains("\"status\":\"signed_out\""), "{}", tail);
    assert!(tail.contains("\"redirect\":\"/admin/login\""), "{}", tail);
}

#[tokio::test]
async fn event_stream_releases_its_subscription() {
    let app = TestApp::new().await;
    let cookie = app.login().await;
    assert_eq!(app.identity.listener_count(), 0);

    let res = app.send(get("/api/session/events", Some(&cookie))).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(app.identity.listener_count(), 1);
    let mut body = res.into_body();

    let res = app.send(request("DELETE", "/api/session", Some(&cookie), Body::empty())).await;
    assert_eq!(res.status(), StatusCode::OK);

    let drained = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(frame) = body.frame().await {
            frame.expect("frame");
        }
    })
    .await;
    assert!(drained.is_ok(), "stream did not end");
    assert_eq!(app.identity.listener_count(), 0);
}
