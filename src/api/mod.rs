//! HTTP surface of the relay: user endpoints, websocket upgrade, status.

pub mod status;
pub mod user;
pub mod websocket;

use crate::{conn::RoomRegistry, store::UserRegistry, Config};
use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

// ========================// App //======================== //

/// Shared state of all request handlers, constructed once at startup.
pub struct AppState {
    pub config: Config,
    pub users: UserRegistry,
    pub rooms: Arc<RoomRegistry>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let rooms = Arc::new(RoomRegistry::new(config.hub_channel_capacity));
        Self {
            config,
            users: UserRegistry::new(),
            rooms,
        }
    }
}

/// Create router of the application.
///
/// - `config`: The global configure of the application.
pub fn make_app(config: Config) -> Router {
    let cors = cors_layer(&config);
    let state = Arc::new(AppState::new(config));

    Router::new()
        .merge(user::router())
        .merge(websocket::router())
        .merge(status::router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Cross-origin policy from the configured origin list.
fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .map(|origin| {
            origin
                .parse()
                .expect("invalid origin in ALLOWED_ORIGINS")
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE])
}
