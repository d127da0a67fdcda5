//! Checksync service binary.
//!
//! Standalone HTTP service for GitHub pull-request webhook handling.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use checksync::server::{build_router, AppState};
use checksync::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("checksync=info".parse()?))
        .init();

    info!("Starting checksync service...");

    let config = Config::default();

    if config.github_token.is_none() {
        warn!("GITHUB_TOKEN is not set. Webhooks will be received but no mutation can be issued.");
    }
    if config.webhook_secret.is_none() {
        warn!("CHECKSYNC_WEBHOOK_SECRET is not set. Webhook signatures will not be verified.");
    }

    let port = config.port;
    let app = build_router(AppState { config });

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(%addr, "Listening for GitHub webhooks");
    axum::serve(listener, app)
        .await
        .context("HTTP server terminated")?;

    Ok(())
}
