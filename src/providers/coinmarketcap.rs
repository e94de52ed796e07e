// =============================================================================
// CoinMarketCap REST Client — latest crypto quotes in USD
// =============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, instrument};

/// Quote currency requested from the provider.
pub const CONVERT: &str = "USD";

const QUOTES_LATEST_PATH: &str = "/v1/cryptocurrency/quotes/latest";

#[derive(Clone)]
pub struct CoinMarketCapClient {
    base_url: String,
    client: reqwest::Client,
}

impl CoinMarketCapClient {
    pub fn new(api_key: &str, base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        let key = HeaderValue::from_str(api_key)
            .context("CoinMarketCap API key is not a valid header value")?;
        default_headers.insert("X-CMC_PRO_API_KEY", key);

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(timeout)
            .build()
            .context("failed to build CoinMarketCap HTTP client")?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(base_url = %base_url, "CoinMarketCapClient initialised");

        Ok(Self { base_url, client })
    }

    /// GET /v1/cryptocurrency/quotes/latest — returns `data[symbol]`, which
    /// carries `name`, `symbol` and `quote.USD.{price, percent_change_24h, market_cap}`.
    #[instrument(skip(self), name = "coinmarketcap::quote")]
    pub async fn quote(&self, symbol: &str) -> Result<serde_json::Value> {
        let url = format!("{}{}", self.base_url, QUOTES_LATEST_PATH);

        let resp = self
            .client
            .get(&url)
            .query(&[("symbol", symbol), ("convert", CONVERT)])
            .send()
            .await
            .context("GET quotes/latest request failed")?;

        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse quotes/latest response")?;

        if !status.is_success() {
            anyhow::bail!("CoinMarketCap GET quotes/latest returned {}: {}", status, body);
        }

        let entry = symbol_entry(&body, symbol)?;
        debug!(symbol, "crypto quote retrieved");
        Ok(entry)
    }

    /// USD price only.
    pub async fn price(&self, symbol: &str) -> Result<f64> {
        let entry = self.quote(symbol).await?;
        usd_price(&entry)
    }
}

impl std::fmt::Debug for CoinMarketCapClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoinMarketCapClient")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Response parsing
// -----------------------------------------------------------------------------

/// Pull `data[symbol]` out of a quotes/latest body.
pub fn symbol_entry(body: &serde_json::Value, symbol: &str) -> Result<serde_json::Value> {
    body.get("data")
        .and_then(|d| d.get(symbol))
        .filter(|v| !v.is_null())
        .cloned()
        .with_context(|| format!("quotes/latest response missing data for {symbol}"))
}

/// `quote.USD.price` from a single symbol entry; must be numeric.
pub fn usd_price(entry: &serde_json::Value) -> Result<f64> {
    entry
        .get("quote")
        .and_then(|q| q.get(CONVERT))
        .and_then(|usd| usd.get("price"))
        .and_then(|p| p.as_f64())
        .context("crypto quote missing numeric quote.USD.price")
}
