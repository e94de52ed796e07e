// =============================================================================
// Finnhub REST Client — stock quotes and company profiles
// =============================================================================
//
// SECURITY: The API key is sent as the `X-Finnhub-Token` header on every
// request and is never logged or serialised.
// =============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, instrument};

use crate::types::CompanyName;

/// Finnhub REST API client.
#[derive(Clone)]
pub struct FinnhubClient {
    base_url: String,
    client: reqwest::Client,
}

impl FinnhubClient {
    /// Create a new `FinnhubClient`.
    ///
    /// # Arguments
    /// * `api_key`  — Finnhub API token (sent as a header, never in the URL).
    /// * `base_url` — e.g. `https://finnhub.io/api/v1`.
    /// * `timeout`  — per-request upper bound.
    pub fn new(api_key: &str, base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        let token = HeaderValue::from_str(api_key)
            .context("Finnhub API key is not a valid header value")?;
        default_headers.insert("X-Finnhub-Token", token);

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(timeout)
            .build()
            .context("failed to build Finnhub HTTP client")?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(base_url = %base_url, "FinnhubClient initialised");

        Ok(Self { base_url, client })
    }

    /// GET /quote — the raw quote object (`c`, `o`, `h`, `l`, `pc`, `d`, `dp`).
    ///
    /// Fails unless the current price `c` is present and non-zero; Finnhub
    /// answers unknown tickers with an all-zero quote.
    #[instrument(skip(self), name = "finnhub::quote")]
    pub async fn quote(&self, symbol: &str) -> Result<serde_json::Value> {
        let url = format!("{}/quote", self.base_url);
        let body = self.get_json(&url, symbol, "GET /quote").await?;
        current_price(&body)?;
        debug!(symbol, "quote retrieved");
        Ok(body)
    }

    /// Current price only.
    pub async fn price(&self, symbol: &str) -> Result<f64> {
        let body = self.quote(symbol).await?;
        current_price(&body)
    }

    /// GET /stock/profile2 — company display name and ticker.
    #[instrument(skip(self), name = "finnhub::company_profile")]
    pub async fn company_profile(&self, symbol: &str) -> Result<CompanyName> {
        let url = format!("{}/stock/profile2", self.base_url);
        let body = self.get_json(&url, symbol, "GET /stock/profile2").await?;
        let profile = company_name(&body)?;
        debug!(symbol, name = %profile.name, "company profile retrieved");
        Ok(profile)
    }

    async fn get_json(&self, url: &str, symbol: &str, what: &str) -> Result<serde_json::Value> {
        let resp = self
            .client
            .get(url)
            .query(&[("symbol", symbol)])
            .send()
            .await
            .with_context(|| format!("{what} request failed"))?;

        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .with_context(|| format!("failed to parse {what} response"))?;

        if !status.is_success() {
            anyhow::bail!("Finnhub {} returned {}: {}", what, status, body);
        }
        Ok(body)
    }
}

impl std::fmt::Debug for FinnhubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinnhubClient")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Response parsing
// -----------------------------------------------------------------------------

/// Extract the non-zero current price `c` from a quote body.
pub fn current_price(body: &serde_json::Value) -> Result<f64> {
    let c = body
        .get("c")
        .and_then(|v| v.as_f64())
        .context("quote response missing current price 'c'")?;
    if c == 0.0 {
        anyhow::bail!("quote response has zero current price (unknown symbol?)");
    }
    Ok(c)
}

/// Extract `{name, symbol: ticker}` from a profile body. `name` must be non-empty.
pub fn company_name(body: &serde_json::Value) -> Result<CompanyName> {
    let name = body
        .get("name")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .context("profile response missing 'name'")?;
    let symbol = body
        .get("ticker")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    Ok(CompanyName {
        name: name.to_string(),
        symbol: symbol.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn current_price_reads_c() {
        let body = json!({ "c": 189.84, "o": 187.0, "h": 190.1, "l": 186.5, "pc": 188.0, "d": 1.84, "dp": 0.98 });
        assert!((current_price(&body).unwrap() - 189.84).abs() < f64::EPSILON);
    }

    #[test]
    fn current_price_rejects_unknown_symbol_shape() {
        let body = json!({ "c": 0, "d": null, "dp": null, "h": 0, "l": 0, "o": 0, "pc": 0, "t": 0 });
        assert!(current_price(&body).is_err());
    }

    #[test]
    fn current_price_rejects_missing_or_null() {
        assert!(current_price(&json!({})).is_err());
        assert!(current_price(&json!({ "c": null })).is_err());
        assert!(current_price(&json!({ "c": "12.5" })).is_err());
    }

    #[test]
    fn company_name_maps_ticker_to_symbol() {
        let body = json!({ "name": "Apple Inc", "ticker": "AAPL", "exchange": "NASDAQ" });
        let profile = company_name(&body).unwrap();
        assert_eq!(profile.name, "Apple Inc");
        assert_eq!(profile.symbol, "AAPL");
    }

    #[test]
    fn company_name_requires_name() {
        assert!(company_name(&json!({})).is_err());
        assert!(company_name(&json!({ "name": "", "ticker": "ZZZZ" })).is_err());
    }

    #[test]
    fn debug_redacts_key() {
        let client =
            FinnhubClient::new("fh-secret", "https://example.test/", Duration::from_secs(1)).unwrap();
        let dbg = format!("{client:?}");
        assert!(!dbg.contains("fh-secret"));
        assert!(dbg.contains("https://example.test\""));
    }

    #[test]
    fn key_with_control_characters_fails_construction() {
        let err = FinnhubClient::new("fh\nsecret", "https://example.test", Duration::from_secs(1))
            .unwrap_err();
        assert!(err.to_string().contains("not a valid header value"));
        assert!(!format!("{err:#}").contains("fh\nsecret"));
    }
}
