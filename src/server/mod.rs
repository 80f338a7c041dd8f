//! Push server
//!
//! HTTP status route plus the `/ws` WebSocket push channel backed by the
//! [`BroadcastHub`].

mod ws;

use crate::config::ServerConfig;
use crate::hub::BroadcastHub;
use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Static liveness text served at `/`
pub const STATUS_TEXT: &str = "Kline relay is running.";

/// Origin that is always allowed, for local testing
const LOCAL_ORIGIN: &str = "http://127.0.0.1";

/// WebSocket keepalive settings
#[derive(Debug, Clone, Copy)]
pub struct Keepalive {
    pub ping_interval: Duration,
    pub idle_timeout: Duration,
}

impl Keepalive {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            ping_interval: Duration::from_secs(config.ping_interval_secs.max(1)),
            idle_timeout: Duration::from_secs(config.idle_timeout_secs.max(1)),
        }
    }
}

impl Default for Keepalive {
    fn default() -> Self {
        Self::from_config(&ServerConfig::default())
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<BroadcastHub>,
    pub keepalive: Keepalive,
}

/// Build the router with CORS restricted to `allowed_origin` and the local origin
pub fn router(state: AppState, allowed_origin: &str) -> anyhow::Result<Router> {
    Ok(Router::new()
        .route("/", get(status))
        .route("/ws", get(ws::ws_handler))
        .layer(cors_layer(allowed_origin)?)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// CORS policy for browser clients
pub fn cors_layer(allowed_origin: &str) -> anyhow::Result<CorsLayer> {
    let mut origins = vec![HeaderValue::from_str(allowed_origin)
        .map_err(|e| anyhow::anyhow!("Invalid allowed origin {:?}: {}", allowed_origin, e))?];
    if allowed_origin != LOCAL_ORIGIN {
        origins.push(HeaderValue::from_static(LOCAL_ORIGIN));
    }

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true))
}

/// Serve until Ctrl-C
pub async fn serve(listener: TcpListener, app: Router) -> anyhow::Result<()> {
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

async fn status() -> &'static str {
    STATUS_TEXT
}
