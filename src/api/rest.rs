// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// Quote pass-through:   GET  /stock/:symbol, /stock/info/:symbol, /crypto/:symbol
// Watchlist:            POST /dashboard/add, /dashboard/remove
//                       GET  /dashboard
// Identity:             GET  /auth/google, /auth/google/callback, /logout
// Everything else falls through to the static `public/` directory, except
// `/dashboard.html`, which requires a session.
//
// CORS is permissive, matching the browser front-end's expectations.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Json, Path, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{info, warn};

use crate::api::auth;
use crate::app_state::AppState;
use crate::error::ApiError;
use crate::types::{normalize_symbol, AssetKind, CompanyName};
use crate::watchlist::DashboardRow;

// =============================================================================
// Router construction
// =============================================================================

/// Build the full router with CORS middleware, static files, and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let static_files = ServeDir::new(&state.config.public_dir);

    Router::new()
        .route("/health", get(health))
        // ── Quotes ──────────────────────────────────────────────────
        .route("/stock/:symbol", get(stock_quote))
        .route("/stock/info/:symbol", get(stock_info))
        .route("/crypto/:symbol", get(crypto_quote))
        // ── Watchlist ───────────────────────────────────────────────
        .route("/dashboard", get(dashboard))
        .route("/dashboard/add", post(dashboard_add))
        .route("/dashboard/remove", post(dashboard_remove))
        // ── Identity ────────────────────────────────────────────────
        .route("/auth/google", get(auth::login))
        .route("/auth/google/callback", get(auth::callback))
        .route("/logout", get(auth::logout))
        .route(auth::DASHBOARD_PAGE, get(auth::dashboard_page))
        // ── Middleware & State ───────────────────────────────────────
        .fallback_service(static_files)
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    watchlist_len: usize,
    uptime_secs: u64,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        watchlist_len: state.watchlist.len(),
        uptime_secs: state.uptime_secs(),
        server_time: chrono::Utc::now().timestamp_millis(),
    })
}

// =============================================================================
// Single-symbol quotes
// =============================================================================

async fn stock_quote(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let symbol = normalize_symbol(&symbol);
    state.prices.stock_quote(&symbol).await.map(Json).map_err(|e| {
        warn!(symbol = %symbol, error = %e, "stock quote failed");
        ApiError::UpstreamUnavailable("Stock price data fetch error")
    })
}

async fn stock_info(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<Json<CompanyName>, ApiError> {
    let symbol = normalize_symbol(&symbol);
    state.prices.fetch_name(&symbol).await.map(Json).map_err(|e| {
        warn!(symbol = %symbol, error = %e, "stock profile failed");
        ApiError::UpstreamUnavailable("Stock name fetch error")
    })
}

async fn crypto_quote(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let symbol = normalize_symbol(&symbol);
    state.prices.crypto_quote(&symbol).await.map(Json).map_err(|e| {
        warn!(symbol = %symbol, error = %e, "crypto quote failed");
        ApiError::UpstreamUnavailable("Crypto data fetch error")
    })
}

// =============================================================================
// Watchlist
// =============================================================================

#[derive(Debug, Deserialize)]
struct DashboardItemRequest {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    symbol: Option<String>,
}

impl DashboardItemRequest {
    /// Both fields present, non-empty, and `type` one of `stock` / `crypto`.
    fn validate(self) -> Result<(AssetKind, String), ApiError> {
        let kind = self
            .kind
            .as_deref()
            .and_then(AssetKind::parse)
            .ok_or(ApiError::InvalidInput("Invalid data"))?;
        let symbol = self
            .symbol
            .filter(|s| !s.trim().is_empty())
            .ok_or(ApiError::InvalidInput("Invalid data"))?;
        Ok((kind, symbol))
    }
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

async fn dashboard_add(
    State(state): State<Arc<AppState>>,
    body: Result<Json<DashboardItemRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(req) = body.map_err(|e| {
        warn!(error = %e, "dashboard add: unreadable body");
        ApiError::InvalidInput("Invalid data")
    })?;
    let (kind, symbol) = req.validate()?;

    if state.watchlist.add(kind, &symbol)? {
        info!(%kind, symbol = %normalize_symbol(&symbol), "added to dashboard");
    }
    Ok(Json(MessageResponse {
        message: "Added to dashboard",
    }))
}

/// Removing something that is not tracked (or an unreadable body) is a no-op.
async fn dashboard_remove(
    State(state): State<Arc<AppState>>,
    body: Result<Json<DashboardItemRequest>, JsonRejection>,
) -> Json<MessageResponse> {
    let item = match body {
        Ok(Json(req)) => req.validate().ok(),
        Err(_) => None,
    };
    if let Some((kind, symbol)) = item {
        if state.watchlist.remove(kind, &symbol) {
            info!(%kind, symbol = %normalize_symbol(&symbol), "removed from dashboard");
        }
    }
    Json(MessageResponse {
        message: "Removed from dashboard",
    })
}

async fn dashboard(State(state): State<Arc<AppState>>) -> Json<Vec<DashboardRow>> {
    if state.watchlist.is_empty() {
        return Json(Vec::new());
    }
    let snapshot = state.watchlist.list();
    let rows = state
        .aggregator
        .aggregate(snapshot, state.prices.as_ref())
        .await;
    Json(rows)
}

// =============================================================================
// Tests
// =============================================================================
