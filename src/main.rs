// =============================================================================
// Quote Desk — Main Entry Point
// =============================================================================
//
// Proxies stock (Finnhub) and crypto (CoinMarketCap) price lookups, keeps an
// in-memory watchlist priced on demand, and gates the dashboard page behind
// an OAuth login. The watchlist is not persisted; a restart empties it.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod config;
mod error;
mod identity;
mod providers;
mod session;
mod types;
mod watchlist;

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::config::{Credentials, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Quote Desk starting up");

    let config = ServerConfig::from_env();
    let creds = Credentials::from_env();

    info!(
        bind_addr = %config.bind_addr,
        public_dir = %config.public_dir,
        private_dir = %config.private_dir,
        upstream_timeout_secs = config.upstream_timeout_secs,
        max_concurrent_lookups = config.max_concurrent_lookups,
        "Configuration resolved"
    );

    if std::path::Path::new(&config.private_dir).starts_with(&config.public_dir) {
        warn!("private_dir is inside public_dir; gated pages are reachable without a session");
    }

    // ── 2. Build shared state ────────────────────────────────────────────
    let state = Arc::new(AppState::new(config, &creds)?);

    // ── 3. Start the HTTP server ─────────────────────────────────────────
    let bind_addr = state.config.bind_addr.clone();
    let app = api::rest::router(state.clone());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    info!(addr = %bind_addr, "Server running");

    // ── 4. Graceful shutdown ─────────────────────────────────────────────
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
            warn!("Shutdown signal received — stopping gracefully");
        })
        .await
        .context("HTTP server failed")?;

    info!(
        watchlist_len = state.watchlist.len(),
        sessions = state.sessions.active_sessions(),
        "Quote Desk shut down complete; watchlist discarded"
    );
    Ok(())
}
