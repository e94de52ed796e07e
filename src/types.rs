// =============================================================================
// Shared types used across the quote desk
// =============================================================================

use serde::{Deserialize, Serialize};

/// Which upstream market a symbol belongs to.
///
/// On the wire this is the literal string `"stock"` or `"crypto"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Stock,
    Crypto,
}

impl AssetKind {
    /// Parse the wire form. Anything other than `stock` / `crypto` is rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "stock" => Some(Self::Stock),
            "crypto" => Some(Self::Crypto),
            _ => None,
        }
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stock => write!(f, "stock"),
            Self::Crypto => write!(f, "crypto"),
        }
    }
}

/// One tracked `(kind, symbol)` pair. Symbols are stored upper-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WatchlistEntry {
    #[serde(rename = "type")]
    pub kind: AssetKind,
    pub symbol: String,
}

impl WatchlistEntry {
    pub fn new(kind: AssetKind, symbol: impl Into<String>) -> Self {
        Self {
            kind,
            symbol: symbol.into(),
        }
    }
}

/// Display name returned by the stock metadata lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyName {
    pub name: String,
    pub symbol: String,
}

/// Upper-case and trim a caller-supplied ticker.
pub fn normalize_symbol(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_kind_parses_wire_literals() {
        assert_eq!(AssetKind::parse("stock"), Some(AssetKind::Stock));
        assert_eq!(AssetKind::parse("crypto"), Some(AssetKind::Crypto));
        assert_eq!(AssetKind::parse("forex"), None);
        assert_eq!(AssetKind::parse(""), None);
    }

    #[test]
    fn entry_serialises_kind_as_type() {
        let entry = WatchlistEntry::new(AssetKind::Crypto, "BTC");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "crypto", "symbol": "BTC" }));
    }

    #[test]
    fn normalize_symbol_uppercases_and_trims() {
        assert_eq!(normalize_symbol("  aapl "), "AAPL");
        assert_eq!(normalize_symbol("Btc"), "BTC");
    }
}
