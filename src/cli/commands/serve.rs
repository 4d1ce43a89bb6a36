//! Serve command handler
//!
//! Thin adapter that assembles the proxy from configuration and runs the
//! HTTP server until Ctrl-C.

use anyhow::{Context, Result};

use crate::adapters::http::{AppState, StocksHttpServer};
use crate::domain::models::Config;

/// Handle `fonpick serve`
pub async fn handle_serve(mut config: Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let state = AppState::from_config(&config).context("Failed to build upstream client")?;
    tracing::info!(
        upstream = %config.upstream.base_url,
        cache_capacity = config.cache.capacity,
        single_flight = config.proxy.single_flight,
        "starting stock proxy"
    );

    StocksHttpServer::new(state, config.server)
        .serve_with_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
