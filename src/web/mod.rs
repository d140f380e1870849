//! Web layer: the HTTP front end of the relay.
//!
//! Exposes exactly two routes, both prefix-matched: `/play/` relays the
//! resolved stream's bytes, `/301/` redirects to its source URL. Every
//! other path is a `404`. Each accepted connection is served by its own
//! task with its own [`crate::session::Session`]; the plugin registry and
//! the cache are the only shared state.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::cache::StreamCache;
use crate::config::Config;
use crate::plugins::PluginRegistry;

pub mod handlers;

/// State shared across all request workers. Everything here is
/// read-only or internally synchronized.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<PluginRegistry>,
    pub cache: Arc<StreamCache>,
}

/// Build the relay router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/play/", get(handlers::play))
        .route("/play/{*tail}", get(handlers::play))
        .route("/301/", get(handlers::redirect))
        .route("/301/{*tail}", get(handlers::redirect))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Web server configuration and setup
pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(
        config: Config,
        registry: Arc<PluginRegistry>,
        cache: Arc<StreamCache>,
    ) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", config.web.host, config.web.port).parse()?;
        let app = create_router(AppState {
            config: Arc::new(config),
            registry,
            cache,
        });
        Ok(Self { app, addr })
    }

    /// Start the web server. Runs until ctrl-c; in-flight relays are
    /// allowed to finish naturally.
    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
