// =============================================================================
// Watchlist Store — process-local, deduplicated (kind, symbol) list
// =============================================================================
//
// Nothing is persisted; the list starts empty on every restart. Symbols are
// normalised (trimmed, upper-cased) on the way in, so `aapl` and `AAPL` are
// the same entry.
// =============================================================================

use parking_lot::RwLock;
use tracing::debug;

use crate::error::ApiError;
use crate::types::{normalize_symbol, AssetKind, WatchlistEntry};

#[derive(Debug, Default)]
pub struct WatchlistStore {
    entries: RwLock<Vec<WatchlistEntry>>,
}

impl WatchlistStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `(kind, symbol)` unless it is already tracked.
    ///
    /// Returns `Ok(true)` when a new entry was added, `Ok(false)` for a
    /// duplicate. An empty symbol is `InvalidInput`.
    pub fn add(&self, kind: AssetKind, symbol: &str) -> Result<bool, ApiError> {
        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() {
            return Err(ApiError::InvalidInput("Invalid data"));
        }

        let mut entries = self.entries.write();
        if entries.iter().any(|e| e.kind == kind && e.symbol == symbol) {
            debug!(%kind, %symbol, "watchlist add ignored: already tracked");
            return Ok(false);
        }
        debug!(%kind, %symbol, "watchlist entry added");
        entries.push(WatchlistEntry::new(kind, symbol));
        Ok(true)
    }

    /// Drop `(kind, symbol)` if present. Returns whether anything was removed.
    pub fn remove(&self, kind: AssetKind, symbol: &str) -> bool {
        let symbol = normalize_symbol(symbol);
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|e| !(e.kind == kind && e.symbol == symbol));
        let removed = entries.len() != before;
        if removed {
            debug!(%kind, %symbol, "watchlist entry removed");
        }
        removed
    }

    /// Snapshot of the current entries in insertion order.
    pub fn list(&self) -> Vec<WatchlistEntry> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
