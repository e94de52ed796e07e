// =============================================================================
// Pricing Gateway — (kind, symbol) → upstream provider call
// =============================================================================
//
// Stateless: every call is one outbound request, no retry, no caching. The
// `PriceSource` trait is the seam the watchlist aggregator and the HTTP routes
// depend on, so tests can swap in a stub.
// =============================================================================

pub mod coinmarketcap;
pub mod finnhub;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::{Credentials, ServerConfig};
use crate::types::{AssetKind, CompanyName};

pub use coinmarketcap::CoinMarketCapClient;
pub use finnhub::FinnhubClient;

#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Latest price for one symbol.
    async fn fetch_price(&self, kind: AssetKind, symbol: &str) -> Result<f64>;

    /// Company display name (stocks only).
    async fn fetch_name(&self, symbol: &str) -> Result<CompanyName>;

    /// Raw upstream stock quote object.
    async fn stock_quote(&self, symbol: &str) -> Result<serde_json::Value>;

    /// Raw upstream crypto quote object for `symbol`.
    async fn crypto_quote(&self, symbol: &str) -> Result<serde_json::Value>;
}

/// Production gateway backed by Finnhub (stocks) and CoinMarketCap (crypto).
#[derive(Debug, Clone)]
pub struct PricingGateway {
    stocks: FinnhubClient,
    crypto: CoinMarketCapClient,
}

impl PricingGateway {
    pub fn new(stocks: FinnhubClient, crypto: CoinMarketCapClient) -> Self {
        Self { stocks, crypto }
    }

    pub fn from_config(config: &ServerConfig, creds: &Credentials) -> Result<Self> {
        let timeout = config.upstream_timeout();
        let stocks = FinnhubClient::new(&creds.finnhub_api_key, &config.finnhub_base_url, timeout)?;
        let crypto = CoinMarketCapClient::new(
            &creds.coinmarketcap_api_key,
            &config.coinmarketcap_base_url,
            timeout,
        )?;
        Ok(Self::new(stocks, crypto))
    }
}

#[async_trait]
impl PriceSource for PricingGateway {
    async fn fetch_price(&self, kind: AssetKind, symbol: &str) -> Result<f64> {
        match kind {
            AssetKind::Stock => self.stocks.price(symbol).await,
            AssetKind::Crypto => self.crypto.price(symbol).await,
        }
    }

    async fn fetch_name(&self, symbol: &str) -> Result<CompanyName> {
        self.stocks.company_profile(symbol).await
    }

    async fn stock_quote(&self, symbol: &str) -> Result<serde_json::Value> {
        self.stocks.quote(symbol).await
    }

    async fn crypto_quote(&self, symbol: &str) -> Result<serde_json::Value> {
        self.crypto.quote(symbol).await
    }
}
