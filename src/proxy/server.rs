//! HTTP server setup and configuration.

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::forward::Proxy;
use super::handlers;
use crate::client::UpstreamClient;
use crate::config::Config;

/// Bind the two completion routes to `proxy`.
///
/// The returned router has no prefix and no middleware, so it can be merged
/// or nested into a larger application.
pub fn bind_router(proxy: Arc<Proxy>) -> Router {
    Router::new()
        .route("/chat/completions", post(handlers::chat_completions))
        .route("/completions", post(handlers::completions))
        .with_state(proxy)
}

/// Create the axum router with all endpoints.
///
/// Completion routes are mounted under `route_prefix` ("" or "/" mounts them
/// at the root).
pub fn create_router(proxy: Arc<Proxy>, route_prefix: &str) -> Router {
    let api = bind_router(proxy);

    let router = match route_prefix {
        "" | "/" => Router::new().merge(api),
        prefix => Router::new().nest(prefix, api),
    };

    router
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server until Ctrl-C.
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let listen_addr = config.server.listen.clone();

    let client = UpstreamClient::from_config(&config.upstream)?;
    let proxy = Proxy::new(client).log_payloads(config.logging.log_payloads);

    let app = create_router(Arc::new(proxy), &config.server.route_prefix);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!(
        address = %listen_addr,
        upstream = %config.upstream.base_url,
        route_prefix = %config.server.route_prefix,
        "Starting openai-proxy server"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
