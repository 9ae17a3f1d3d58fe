use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::handlers::{protected, public};
use crate::middleware::{identity_gate, require_admin, track_activity};
use crate::state::AppState;

/// Full application router.
pub fn app(state: AppState) -> Router {
    let config = state.config.clone();

    Router::new()
        .merge(public_routes())
        .merge(gated_routes(state.clone()))
        // Global middleware
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.server.max_request_size_bytes))
        .layer(cors_layer(&config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    use public::{contact, content, login, media, root};

    Router::new()
        .route("/", get(root::get))
        .route("/health", get(root::health))
        // Site content
        .route("/api/news", get(content::news_list))
        .route("/api/news/:slug", get(content::news_get))
        .route("/api/press", get(content::press_list))
        .route("/api/gallery", get(content::gallery_list))
        .route("/api/board", get(content::board_list))
        .route("/api/history", get(content::history_list))
        .route("/api/contact", post(contact::post))
        // Sign-in and stored media
        .route("/auth/login", post(login::post))
        .route("/media/*path", get(media::get))
}

/// Everything behind the identity gate. The gate runs first, then the
/// per-group activity and authorization layers.
fn gated_routes(state: AppState) -> Router<AppState> {
    use protected::{admin, session, shell, storage};

    let admin_data = Router::new()
        .route("/api/admin/:collection", get(admin::list).post(admin::create))
        .route(
            "/api/admin/:collection/:id",
            get(admin::get).put(admin::update).delete(admin::delete),
        )
        .route("/api/admin/:collection/:id/image", post(admin::upload_image))
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn(track_activity));

    let storage_routes = Router::new()
        .route("/api/storage/upload", post(storage::upload))
        .route("/api/storage", axum::routing::delete(storage::delete))
        .route("/api/storage/health", get(storage::health))
        .route_layer(from_fn(track_activity));

    Router::new()
        .route("/admin", get(shell::admin_page))
        .route("/admin/login", get(shell::login_page))
        .route("/api/session", get(session::get).delete(session::delete))
        .route("/api/session/extend", post(session::extend))
        .route("/api/session/activity", post(session::activity))
        .route("/api/session/events", get(session::events))
        .merge(admin_data)
        .merge(storage_routes)
        .route_layer(from_fn_with_state(state, identity_gate))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}
