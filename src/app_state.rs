// =============================================================================
// Central Application State — Quote Desk
// =============================================================================
//
// Shared across all handlers via `Arc<AppState>`.
//
// Thread safety:
//   - `WatchlistStore` and `SessionStore` guard their collections with
//     parking_lot::RwLock internally.
//   - The price source is a stateless `Arc<dyn PriceSource>`.
// =============================================================================

use std::sync::Arc;

use anyhow::Result;

use crate::config::{Credentials, ServerConfig};
use crate::identity::IdentityClient;
use crate::providers::{PriceSource, PricingGateway};
use crate::session::SessionStore;
use crate::watchlist::{WatchlistAggregator, WatchlistStore};

pub struct AppState {
    // ── Configuration ───────────────────────────────────────────────────
    pub config: ServerConfig,

    // ── Pricing ─────────────────────────────────────────────────────────
    pub prices: Arc<dyn PriceSource>,
    pub aggregator: WatchlistAggregator,

    // ── Watchlist ───────────────────────────────────────────────────────
    pub watchlist: WatchlistStore,

    // ── Identity ────────────────────────────────────────────────────────
    pub identity: IdentityClient,
    pub sessions: SessionStore,

    /// Instant when the server was started.
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Wire up the production gateway and identity client.
    pub fn new(config: ServerConfig, creds: &Credentials) -> Result<Self> {
        let prices: Arc<dyn PriceSource> = Arc::new(PricingGateway::from_config(&config, creds)?);
        Self::with_price_source(config, creds, prices)
    }

    /// Same as [`AppState::new`] with a caller-supplied price source.
    pub fn with_price_source(
        config: ServerConfig,
        creds: &Credentials,
        prices: Arc<dyn PriceSource>,
    ) -> Result<Self> {
        let identity = IdentityClient::new(
            creds.google_client_id.clone(),
            creds.google_client_secret.clone(),
            config.oauth.clone(),
            config.upstream_timeout(),
        )?;
        let aggregator =
            WatchlistAggregator::new(config.lookup_concurrency(), config.upstream_timeout());

        Ok(Self {
            prices,
            aggregator,
            watchlist: WatchlistStore::new(),
            identity,
            sessions: SessionStore::new(&creds.session_secret),
            config,
            start_time: std::time::Instant::now(),
        })
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
