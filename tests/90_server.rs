mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn binary_serves_health_and_descriptor() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client.get(format!("{}/health", server.base_url)).send().await?;
    assert_eq!(res.status(), StatusCode::OK, "expected 200 OK, got {}", res.status());
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["data"]["database_backend"], "memory", "unexpected body: {}", body);

    let res = client.get(format!("{}/", server.base_url)).send().await?;
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["data"]["name"], "association-cms");

    Ok(())
}

#[tokio::test]
async fn binary_gates_admin_routes() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;

    let res = client.get(format!("{}/admin", server.base_url)).send().await?;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);

    let res = client.get(format!("{}/api/session", server.base_url)).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .post(format!("{}/auth/login", server.base_url))
        .json(&json!({ "email": "nobody@example.org", "password": "whatever1" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}
