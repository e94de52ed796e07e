// =============================================================================
// Watchlist Aggregator — fan out price lookups over a watchlist snapshot
// =============================================================================
//
// One lookup per entry, at most `concurrency` in flight, each bounded by
// `timeout`. Output order always matches the snapshot order, and output
// length always equals snapshot length: a failed lookup only marks its own
// row.
// =============================================================================

use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, warn};

use crate::providers::PriceSource;
use crate::types::{AssetKind, WatchlistEntry};

/// Marker rendered when the lookup failed or timed out.
pub const ERROR_MARKER: &str = "Error";
/// Marker rendered when the provider answered, but with a zero or non-finite
/// price (a listed coin with no trading price, for instance).
pub const NOT_AVAILABLE_MARKER: &str = "N/A";

/// Outcome of one entry's lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PriceCell {
    Price(f64),
    NotAvailable,
    Error,
}

impl PriceCell {
    fn from_price(price: f64) -> Self {
        if price.is_finite() && price != 0.0 {
            Self::Price(price)
        } else {
            Self::NotAvailable
        }
    }
}

impl std::fmt::Display for PriceCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Price(p) => write!(f, "{p:.2}"),
            Self::NotAvailable => f.write_str(NOT_AVAILABLE_MARKER),
            Self::Error => f.write_str(ERROR_MARKER),
        }
    }
}

/// One row of the `/dashboard` response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardRow {
    #[serde(rename = "type")]
    pub kind: AssetKind,
    pub symbol: String,
    pub price: String,
}

#[derive(Debug, Clone, Copy)]
pub struct WatchlistAggregator {
    concurrency: usize,
    timeout: Duration,
}

impl WatchlistAggregator {
    pub fn new(concurrency: usize, timeout: Duration) -> Self {
        Self {
            concurrency: concurrency.max(1),
            timeout,
        }
    }

    /// Price every entry in `entries`, preserving order.
    pub async fn aggregate(
        &self,
        entries: Vec<WatchlistEntry>,
        source: &dyn PriceSource,
    ) -> Vec<DashboardRow> {
        let total = entries.len();
        let timeout = self.timeout;

        let rows: Vec<DashboardRow> = stream::iter(entries)
            .map(|entry| async move {
                let cell = lookup(source, &entry, timeout).await;
                DashboardRow {
                    kind: entry.kind,
                    symbol: entry.symbol,
                    price: cell.to_string(),
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let failed = rows.iter().filter(|r| r.price == ERROR_MARKER).count();
        debug!(total, failed, "watchlist aggregated");
        rows
    }
}

async fn lookup(source: &dyn PriceSource, entry: &WatchlistEntry, timeout: Duration) -> PriceCell {
    match tokio::time::timeout(timeout, source.fetch_price(entry.kind, &entry.symbol)).await {
        Ok(Ok(price)) => PriceCell::from_price(price),
        Ok(Err(e)) => {
            warn!(kind = %entry.kind, symbol = %entry.symbol, error = %e, "price lookup failed");
            PriceCell::Error
        }
        Err(_) => {
            warn!(
                kind = %entry.kind,
                symbol = %entry.symbol,
                timeout_ms = timeout.as_millis() as u64,
                "price lookup timed out"
            );
            PriceCell::Error
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::Result;
    use async_trait::async_trait;

    use crate::types::CompanyName;

    /// Stub source: fixed prices, optional per-symbol delay, everything else fails.
    #[derive(Default)]
    struct StubSource {
        prices: HashMap<String, f64>,
        delays: HashMap<String, Duration>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl StubSource {
        fn with_price(mut self, symbol: &str, price: f64) -> Self {
            self.prices.insert(symbol.to_string(), price);
            self
        }

        fn with_delay(mut self, symbol: &str, delay: Duration) -> Self {
            self.delays.insert(symbol.to_string(), delay);
            self
        }
    }

    #[async_trait]
    impl PriceSource for StubSource {
        async fn fetch_price(&self, _kind: AssetKind, symbol: &str) -> Result<f64> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if let Some(delay) = self.delays.get(symbol) {
                tokio::time::sleep(*delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.prices
                .get(symbol)
                .copied()
                .ok_or_else(|| anyhow::anyhow!("unknown symbol {symbol}"))
        }

        async fn fetch_name(&self, _symbol: &str) -> Result<CompanyName> {
            anyhow::bail!("not used")
        }

        async fn stock_quote(&self, _symbol: &str) -> Result<serde_json::Value> {
            anyhow::bail!("not used")
        }

        async fn crypto_quote(&self, _symbol: &str) -> Result<serde_json::Value> {
            anyhow::bail!("not used")
        }
    }

    fn entry(kind: AssetKind, symbol: &str) -> WatchlistEntry {
        WatchlistEntry::new(kind, symbol)
    }

    #[test]
    fn price_cell_renders_two_decimals() {
        assert_eq!(PriceCell::Price(42.0).to_string(), "42.00");
        assert_eq!(PriceCell::Price(42.5).to_string(), "42.50");
        assert_eq!(PriceCell::Price(123.4).to_string(), "123.40");
        assert_eq!(PriceCell::Price(0.004).to_string(), "0.00");
        assert_eq!(PriceCell::from_price(f64::NAN).to_string(), "N/A");
        assert_eq!(PriceCell::from_price(0.0).to_string(), "N/A");
        assert_eq!(PriceCell::from_price(0.004).to_string(), "0.00");
        assert_eq!(PriceCell::Error.to_string(), "Error");
    }

    #[tokio::test]
    async fn empty_watchlist_yields_empty_rows() {
        let agg = WatchlistAggregator::new(4, Duration::from_secs(1));
        let rows = agg.aggregate(Vec::new(), &StubSource::default()).await;
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn all_failures_keep_length() {
        let agg = WatchlistAggregator::new(2, Duration::from_secs(1));
        let entries = vec![
            entry(AssetKind::Stock, "AAA"),
            entry(AssetKind::Crypto, "BBB"),
            entry(AssetKind::Stock, "CCC"),
        ];
        let rows = agg.aggregate(entries, &StubSource::default()).await;
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.price == ERROR_MARKER));
    }

    #[tokio::test]
    async fn single_failure_is_isolated() {
        let source = StubSource::default()
            .with_price("AAPL", 189.5)
            .with_price("ETH", 3050.0);
        let agg = WatchlistAggregator::new(4, Duration::from_secs(1));
        let entries = vec![
            entry(AssetKind::Stock, "AAPL"),
            entry(AssetKind::Stock, "NOPE"),
            entry(AssetKind::Crypto, "ETH"),
        ];
        let rows = agg.aggregate(entries, &source).await;
        let prices: Vec<_> = rows.iter().map(|r| r.price.as_str()).collect();
        assert_eq!(prices, vec!["189.50", "Error", "3050.00"]);
    }

    #[tokio::test]
    async fn zero_price_renders_not_available() {
        let source = StubSource::default()
            .with_price("DEAD", 0.0)
            .with_price("BTC", 123.4);
        let agg = WatchlistAggregator::new(4, Duration::from_secs(1));
        let entries = vec![
            entry(AssetKind::Crypto, "DEAD"),
            entry(AssetKind::Crypto, "BTC"),
            entry(AssetKind::Crypto, "GONE"),
        ];
        let rows = agg.aggregate(entries, &source).await;
        let prices: Vec<_> = rows.iter().map(|r| r.price.as_str()).collect();
        assert_eq!(prices, vec![NOT_AVAILABLE_MARKER, "123.40", ERROR_MARKER]);
    }

    #[tokio::test]
    async fn timed_out_entry_marks_error_in_order() {
        let source = StubSource::default()
            .with_price("SLOW", 1.0)
            .with_delay("SLOW", Duration::from_secs(5))
            .with_price("BTC", 123.4);
        let agg = WatchlistAggregator::new(4, Duration::from_millis(50));
        let entries = vec![entry(AssetKind::Stock, "SLOW"), entry(AssetKind::Crypto, "BTC")];

        let rows = agg.aggregate(entries, &source).await;
        assert_eq!(
            rows,
            vec![
                DashboardRow {
                    kind: AssetKind::Stock,
                    symbol: "SLOW".into(),
                    price: "Error".into(),
                },
                DashboardRow {
                    kind: AssetKind::Crypto,
                    symbol: "BTC".into(),
                    price: "123.40".into(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn output_order_ignores_completion_order() {
        let source = StubSource::default()
            .with_price("A", 1.0)
            .with_delay("A", Duration::from_millis(60))
            .with_price("B", 2.0)
            .with_delay("B", Duration::from_millis(30))
            .with_price("C", 3.0);
        let agg = WatchlistAggregator::new(3, Duration::from_secs(1));
        let entries = vec![
            entry(AssetKind::Stock, "A"),
            entry(AssetKind::Stock, "B"),
            entry(AssetKind::Stock, "C"),
        ];
        let rows = agg.aggregate(entries, &source).await;
        let symbols: Vec<_> = rows.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["A", "B", "C"]);
        assert_eq!(rows[2].price, "3.00");
    }

    #[tokio::test]
    async fn concurrency_is_bounded() {
        let mut source = StubSource::default();
        let mut entries = Vec::new();
        for i in 0..8 {
            let sym = format!("S{i}");
            source = source
                .with_price(&sym, i as f64)
                .with_delay(&sym, Duration::from_millis(20));
            entries.push(entry(AssetKind::Stock, &sym));
        }
        let agg = WatchlistAggregator::new(2, Duration::from_secs(1));
        let rows = agg.aggregate(entries, &source).await;
        assert_eq!(rows.len(), 8);
        assert!(source.max_in_flight.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn rows_serialise_kind_as_type() {
        let row = DashboardRow {
            kind: AssetKind::Stock,
            symbol: "AAPL".into(),
            price: "1.00".into(),
        };
        assert_eq!(
            serde_json::to_value(&row).unwrap(),
            serde_json::json!({ "type": "stock", "symbol": "AAPL", "price": "1.00" })
        );
    }
}
