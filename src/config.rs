// =============================================================================
// Server Configuration — JSON file + environment overrides
// =============================================================================
//
// Non-secret settings come from an optional JSON file. Every field carries a
// serde default so an empty `{}` (or no file at all) yields a working server.
//
// Secrets (provider API keys, OAuth client credentials, the session signing
// key) are read from the environment only and are never serialised.
// =============================================================================

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Default config file name, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "quote_desk.json";

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_public_dir() -> String {
    "public".to_string()
}

fn default_private_dir() -> String {
    "private".to_string()
}

fn default_upstream_timeout_secs() -> u64 {
    10
}

fn default_max_concurrent_lookups() -> usize {
    4
}

fn default_finnhub_base_url() -> String {
    "https://finnhub.io/api/v1".to_string()
}

fn default_coinmarketcap_base_url() -> String {
    "https://pro-api.coinmarketcap.com".to_string()
}

fn default_authorize_url() -> String {
    "https://accounts.google.com/o/oauth2/v2/auth".to_string()
}

fn default_token_url() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_userinfo_url() -> String {
    "https://openidconnect.googleapis.com/v1/userinfo".to_string()
}

fn default_redirect_url() -> String {
    "http://localhost:3000/auth/google/callback".to_string()
}

// =============================================================================
// OAuthEndpoints
// =============================================================================

/// Identity provider endpoints used by the login flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthEndpoints {
    #[serde(default = "default_authorize_url")]
    pub authorize_url: String,

    #[serde(default = "default_token_url")]
    pub token_url: String,

    #[serde(default = "default_userinfo_url")]
    pub userinfo_url: String,

    /// Must match the redirect URI registered with the provider.
    #[serde(default = "default_redirect_url")]
    pub redirect_url: String,
}

impl Default for OAuthEndpoints {
    fn default() -> Self {
        Self {
            authorize_url: default_authorize_url(),
            token_url: default_token_url(),
            userinfo_url: default_userinfo_url(),
            redirect_url: default_redirect_url(),
        }
    }
}

// =============================================================================
// ServerConfig
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address the HTTP server listens on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Directory served as static assets.
    #[serde(default = "default_public_dir")]
    pub public_dir: String,

    /// Directory holding session-gated pages. Must not sit inside
    /// `public_dir`, which is served without a session check.
    #[serde(default = "default_private_dir")]
    pub private_dir: String,

    /// Upper bound on a single upstream call, in seconds.
    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,

    /// How many watchlist lookups may be in flight at once.
    #[serde(default = "default_max_concurrent_lookups")]
    pub max_concurrent_lookups: usize,

    #[serde(default = "default_finnhub_base_url")]
    pub finnhub_base_url: String,

    #[serde(default = "default_coinmarketcap_base_url")]
    pub coinmarketcap_base_url: String,

    #[serde(default)]
    pub oauth: OAuthEndpoints,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            public_dir: default_public_dir(),
            private_dir: default_private_dir(),
            upstream_timeout_secs: default_upstream_timeout_secs(),
            max_concurrent_lookups: default_max_concurrent_lookups(),
            finnhub_base_url: default_finnhub_base_url(),
            coinmarketcap_base_url: default_coinmarketcap_base_url(),
            oauth: OAuthEndpoints::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// A missing file is an error so the caller can fall back to defaults
    /// with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read server config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse server config from {}", path.display()))?;

        info!(path = %path.display(), bind_addr = %config.bind_addr, "server config loaded");
        Ok(config)
    }

    /// Resolve the effective configuration: file (or defaults), then
    /// environment overrides.
    pub fn from_env() -> Self {
        let path = std::env::var("QUOTE_DESK_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let mut config = Self::load(&path).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load config, using defaults");
            Self::default()
        });

        config.apply_overrides(
            std::env::var("QUOTE_DESK_BIND_ADDR").ok(),
            std::env::var("PORT").ok(),
        );
        config
    }

    /// `bind_addr` wins over `port`; a bare port keeps the configured host.
    fn apply_overrides(&mut self, bind_addr: Option<String>, port: Option<String>) {
        if let Some(addr) = bind_addr.filter(|a| !a.trim().is_empty()) {
            self.bind_addr = addr.trim().to_string();
            return;
        }
        if let Some(port) = port.and_then(|p| p.trim().parse::<u16>().ok()) {
            let host = self
                .bind_addr
                .rsplit_once(':')
                .map(|(h, _)| h.to_string())
                .unwrap_or_else(|| "0.0.0.0".to_string());
            self.bind_addr = format!("{host}:{port}");
        }
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs.max(1))
    }

    pub fn lookup_concurrency(&self) -> usize {
        self.max_concurrent_lookups.max(1)
    }
}

// =============================================================================
// Credentials
// =============================================================================

/// Secrets pulled from the environment. Never logged or serialised.
#[derive(Clone, Default)]
pub struct Credentials {
    pub finnhub_api_key: String,
    pub coinmarketcap_api_key: String,
    pub google_client_id: String,
    pub google_client_secret: String,
    pub session_secret: String,
}

impl Credentials {
    /// Missing keys are left empty; the upstream rejects bad credentials.
    /// Without `SESSION_SECRET` a random per-process key is generated, so
    /// sessions do not survive a restart.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).unwrap_or_default();

        let mut session_secret = var("SESSION_SECRET");
        if session_secret.is_empty() {
            warn!("SESSION_SECRET is not set — using a random per-process key");
            session_secret = format!("{}{}", uuid::Uuid::new_v4(), uuid::Uuid::new_v4());
        }

        let creds = Self {
            finnhub_api_key: var("API_KEY"),
            coinmarketcap_api_key: var("COINMARKETCAP_API_KEY"),
            google_client_id: var("GOOGLE_CLIENT_ID"),
            google_client_secret: var("GOOGLE_CLIENT_SECRET"),
            session_secret,
        };

        if creds.finnhub_api_key.is_empty() {
            warn!("API_KEY is not set — stock lookups will be rejected upstream");
        }
        if creds.coinmarketcap_api_key.is_empty() {
            warn!("COINMARKETCAP_API_KEY is not set — crypto lookups will be rejected upstream");
        }
        creds
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("finnhub_api_key", &"<redacted>")
            .field("coinmarketcap_api_key", &"<redacted>")
            .field("google_client_id", &self.google_client_id)
            .field("google_client_secret", &"<redacted>")
            .field("session_secret", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.bind_addr, "0.0.0.0:3000");
        assert_eq!(cfg.public_dir, "public");
        assert_eq!(cfg.private_dir, "private");
        assert_eq!(cfg.upstream_timeout_secs, 10);
        assert_eq!(cfg.max_concurrent_lookups, 4);
        assert!(cfg.finnhub_base_url.starts_with("https://finnhub.io"));
        assert!(cfg.oauth.redirect_url.ends_with("/auth/google/callback"));
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: ServerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:3000");
        assert_eq!(cfg.max_concurrent_lookups, 4);
        assert_eq!(cfg.oauth.token_url, default_token_url());
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "upstream_timeout_secs": 3, "oauth": { "redirect_url": "https://x/cb" } }"#;
        let cfg: ServerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.upstream_timeout(), Duration::from_secs(3));
        assert_eq!(cfg.oauth.redirect_url, "https://x/cb");
        assert_eq!(cfg.oauth.authorize_url, default_authorize_url());
        assert_eq!(cfg.public_dir, "public");
    }

    #[test]
    fn zero_limits_are_clamped() {
        let cfg = ServerConfig {
            upstream_timeout_secs: 0,
            max_concurrent_lookups: 0,
            ..ServerConfig::default()
        };
        assert_eq!(cfg.upstream_timeout(), Duration::from_secs(1));
        assert_eq!(cfg.lookup_concurrency(), 1);
    }

    #[test]
    fn bind_addr_override_wins_over_port() {
        let mut cfg = ServerConfig::default();
        cfg.apply_overrides(Some("127.0.0.1:8080".into()), Some("9000".into()));
        assert_eq!(cfg.bind_addr, "127.0.0.1:8080");
    }

    #[test]
    fn port_override_keeps_host() {
        let mut cfg = ServerConfig::default();
        cfg.apply_overrides(None, Some("9000".into()));
        assert_eq!(cfg.bind_addr, "0.0.0.0:9000");

        cfg.apply_overrides(None, Some("not-a-port".into()));
        assert_eq!(cfg.bind_addr, "0.0.0.0:9000");
    }

    #[test]
    fn credentials_debug_redacts_secrets() {
        let creds = Credentials {
            finnhub_api_key: "fh-secret".into(),
            coinmarketcap_api_key: "cmc-secret".into(),
            google_client_id: "client-id".into(),
            google_client_secret: "g-secret".into(),
            session_secret: "s-secret".into(),
        };
        let dbg = format!("{creds:?}");
        assert!(!dbg.contains("fh-secret"));
        assert!(!dbg.contains("cmc-secret"));
        assert!(!dbg.contains("g-secret"));
        assert!(!dbg.contains("s-secret"));
        assert!(dbg.contains("client-id"));
    }
}
