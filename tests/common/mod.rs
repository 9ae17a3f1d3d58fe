#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use association_cms::config::AppConfig;
use association_cms::database::{DocumentStore, MemoryDocumentStore};
use association_cms::identity::LocalIdentityProvider;
use association_cms::maintenance::create_admin;
use association_cms::routes::app;
use association_cms::session::ManualClock;
use association_cms::state::AppState;
use association_cms::storage::ObjectStorage;
use association_cms::upload::{PrimaryTransport, UploadAdapter};
use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

pub const ADMIN_EMAIL: &str = "board@example.org";
pub const ADMIN_PASSWORD: &str = "correct horse battery";
pub const MEDIA_BASE: &str = "http://cms.test/media";

/// In-process application over a memory store, memory storage and a manual clock.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<dyn DocumentStore>,
    pub clock: Arc<ManualClock>,
    pub identity: Arc<LocalIdentityProvider>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(AppConfig::development()).await
    }

    pub async fn with_config(config: AppConfig) -> Self {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
        create_admin(store.as_ref(), ADMIN_EMAIL, ADMIN_PASSWORD)
            .await
            .expect("seed admin");

        let clock = Arc::new(ManualClock::new(Utc::now()));
        let identity = Arc::new(LocalIdentityProvider::with_clock(
            store.clone(),
            config.security.jwt_secret.clone(),
            config.session.token_ttl_hours,
            clock.clone(),
        ));
        let storage = ObjectStorage::memory(MEDIA_BASE);
        let state = AppState::new(Arc::new(config), store.clone(), storage, identity.clone());

        Self {
            router: app(state.clone()),
            state,
            store,
            clock,
            identity,
        }
    }

    /// Same app with image uploads routed through `primary`.
    pub fn with_primary(mut self, primary: Arc<dyn PrimaryTransport>) -> Self {
        self.state.uploads = UploadAdapter::from_config(primary, &self.state.config.upload);
        self.router = app(self.state.clone());
        self
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.expect("infallible router")
    }

    /// Sign in as the seeded admin and return the `Cookie` header value.
    pub async fn login(&self) -> String {
        let body = serde_json::json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD });
        let response = self.send(json_request("POST", "/auth/login", None, &body)).await;
        assert_eq!(response.status(), StatusCode::OK, "login failed");
        set_cookie(&response).expect("session cookie")
    }
}

/// `name=value` part of the response's `Set-Cookie`, if any.
pub fn set_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    request("GET", uri, cookie, Body::empty())
}

pub fn request(method: &str, uri: &str, cookie: Option<&str>, body: Body) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(body).expect("valid request")
}

pub fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: &Value) -> Request<Body> {
    let mut request = request(method, uri, cookie, Body::from(body.to_string()));
    request
        .headers_mut()
        .insert(header::CONTENT_TYPE, "application/json".parse().expect("header"));
    request
}

/// Single-file multipart request under the `file` field.
pub fn multipart_request(uri: &str, cookie: Option<&str>, name: &str, content_type: &str, bytes: &[u8]) -> Request<Body> {
    let boundary = "cms-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n", name).as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    let mut request = request("POST", uri, cookie, Body::from(body));
    request.headers_mut().insert(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={}", boundary).parse().expect("header"),
    );
    request
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.expect("body").to_bytes().to_vec()
}

static SERVER: OnceLock<TestServer> = OnceLock::new();

/// The real binary, spawned once per test process.
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_association-cms"));
        cmd.env("CMS_PORT", port.to_string())
            .env("SERVER_HOST", "127.0.0.1")
            .env("APP_ENV", "development")
            .env("STORAGE_BACKEND", "memory")
            .env("DATABASE_URL", "")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == reqwest::StatusCode::OK || resp.status() == reqwest::StatusCode::SERVICE_UNAVAILABLE {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}
