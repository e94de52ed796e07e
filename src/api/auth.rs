// =============================================================================
// Login, logout, and the session gate for the dashboard page
// =============================================================================
//
// Flow:
//   GET /auth/google           → 303 to the provider with a fresh `state`
//   GET /auth/google/callback  → verify `state`, exchange `code`, set cookie,
//                                303 to /dashboard.html (or / on failure)
//   GET /logout                → drop session, clear cookie, 303 to /
//
// The JSON API stays open; only the dashboard page requires a session.
// =============================================================================

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Query, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::app_state::AppState;
use crate::session::{
    session_clear_cookie, session_cookie_from_headers, session_set_cookie, UserProfile,
};

/// Page users land on after a successful login.
pub const DASHBOARD_PAGE: &str = "/dashboard.html";

// =============================================================================
// Extractor
// =============================================================================

/// Axum extractor that resolves the signed session cookie to a user.
///
/// A missing, forged, or logged-out cookie redirects the browser to `/`.
pub struct SessionUser(pub UserProfile);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for SessionUser {
    type Rejection = Redirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(cookie) = session_cookie_from_headers(&parts.headers) else {
            return Err(Redirect::to("/"));
        };

        match state.sessions.resolve(&cookie) {
            Some(session) => Ok(SessionUser(session.user)),
            None => {
                warn!("Invalid or expired session cookie presented");
                Err(Redirect::to("/"))
            }
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

pub async fn login(State(state): State<Arc<AppState>>) -> Response {
    let login_state = state.sessions.begin_login();
    match state.identity.authorize_url(&login_state) {
        Ok(url) => Redirect::to(url.as_str()).into_response(),
        Err(e) => {
            warn!(error = %e, "cannot build authorize URL");
            (StatusCode::INTERNAL_SERVER_ERROR, "Login is not configured").into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

pub async fn callback(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    if let Some(err) = query.error {
        warn!(error = %err, "identity provider returned an error");
        return Redirect::to("/").into_response();
    }

    let valid_state = query
        .state
        .as_deref()
        .is_some_and(|s| state.sessions.take_login_state(s));
    if !valid_state {
        warn!("OAuth callback with unknown or expired state");
        return Redirect::to("/").into_response();
    }

    let Some(code) = query.code.filter(|c| !c.is_empty()) else {
        warn!("OAuth callback without code");
        return Redirect::to("/").into_response();
    };

    match state.identity.complete_login(&code).await {
        Ok(user) => {
            info!(sub = %user.sub, "user logged in");
            let cookie = state.sessions.create(user);
            (
                [(header::SET_COOKIE, session_set_cookie(&cookie))],
                Redirect::to(DASHBOARD_PAGE),
            )
                .into_response()
        }
        Err(e) => {
            warn!(error = %e, "OAuth code exchange failed");
            Redirect::to("/").into_response()
        }
    }
}

pub async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Some(cookie) = session_cookie_from_headers(&headers) {
        if state.sessions.destroy(&cookie) {
            info!("user logged out");
        }
    }
    (
        [(header::SET_COOKIE, session_clear_cookie())],
        Redirect::to("/"),
    )
        .into_response()
}

/// Serve the dashboard page to signed-in users only.
///
/// The page lives in `private_dir`, out of reach of the static file service,
/// so percent-encoded spellings of the path cannot bypass this handler.
pub async fn dashboard_page(
    SessionUser(user): SessionUser,
    State(state): State<Arc<AppState>>,
) -> Response {
    let path = std::path::Path::new(&state.config.private_dir).join("dashboard.html");
    match tokio::fs::read_to_string(&path).await {
        Ok(page) => Html(page).into_response(),
        Err(e) => {
            warn!(path = %path.display(), sub = %user.sub, error = %e, "dashboard page missing");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}
