//! # nosa-api
//!
//! HTTP and WebSocket transport over the capture [`Engine`].
//!
//! | route                          | handler                    |
//! |--------------------------------|----------------------------|
//! | `GET /`                        | service directory          |
//! | `GET, DELETE /api/packets`     | query / clear the store    |
//! | `GET /api/capture/status`      | capture status             |
//! | `POST /api/capture/{command}`  | start, stop, pause, resume |
//! | `GET /metrics`                 | Prometheus exposition      |
//! | `GET /ws/packets`              | live packet stream         |

use std::future::Future;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use nosa_config::ServerConfig;
use nosa_core::Engine;
use tokio::net::TcpListener;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::info;

pub mod error;
pub mod handlers;
pub mod ws;

pub use error::ApiError;

/// Query limits applied to `GET /api/packets`.
#[derive(Debug, Clone, Copy)]
pub struct QueryLimits {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl From<&ServerConfig> for QueryLimits {
    fn from(config: &ServerConfig) -> Self {
        Self {
            default_limit: config.default_limit,
            max_limit: config.max_limit,
        }
    }
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self::from(&ServerConfig::default())
    }
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub limits: QueryLimits,
}

impl AppState {
    pub fn new(engine: Arc<Engine>, limits: QueryLimits) -> Self {
        Self { engine, limits }
    }
}

pub fn router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/", get(handlers::root))
        .route(
            "/api/packets",
            get(handlers::packets).delete(handlers::clear_packets),
        )
        .route("/api/capture/status", get(handlers::status))
        .route("/api/capture/start", post(handlers::start))
        .route("/api/capture/stop", post(handlers::stop))
        .route("/api/capture/pause", post(handlers::pause))
        .route("/api/capture/resume", post(handlers::resume))
        .route("/metrics", get(handlers::metrics))
        .route("/ws/packets", get(ws::packets_ws));
    with_layers(routes).with_state(state)
}

/// A panicking handler becomes a 500 JSON response instead of a dropped
/// connection.
fn with_layers(routes: Router<AppState>) -> Router<AppState> {
    routes
        .layer(CatchPanicLayer::custom(error::panic_response))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Binds the configured address and serves until `shutdown` resolves.
pub async fn serve<F>(
    engine: Arc<Engine>,
    config: &ServerConfig,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(&config.bind).await?;
    info!(addr = %listener.local_addr()?, "API listening");

    let app = router(AppState::new(engine, QueryLimits::from(config)));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}
