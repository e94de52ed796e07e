// =============================================================================
// Session Store — server-side login sessions with HMAC-signed cookies
// =============================================================================
//
// Cookie value format: `<session-id>.<hex hmac-sha256(session-id)>`.
// The signature is checked before any map lookup; a forged or truncated
// cookie never reaches the session table. Logout drops the server-side entry,
// so a replayed cookie stops working immediately. Sessions also expire
// `SESSION_TTL_HOURS` after creation; expired entries are swept on the next
// login.
//
// Pending OAuth `state` values live here too and are single-use.
// =============================================================================

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, info};

type HmacSha256 = Hmac<Sha256>;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "quote_desk_session";

/// How long a login `state` stays valid while the user is at the provider.
const LOGIN_STATE_TTL_MINUTES: i64 = 10;

/// Lifetime of a session, counted from login.
pub const SESSION_TTL_HOURS: i64 = 24;

/// Authenticated user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub user: UserProfile,
    pub created_at: DateTime<Utc>,
}

impl Session {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at >= Duration::hours(SESSION_TTL_HOURS)
    }
}

pub struct SessionStore {
    secret: Vec<u8>,
    sessions: RwLock<HashMap<String, Session>>,
    pending_states: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl SessionStore {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
            sessions: RwLock::new(HashMap::new()),
            pending_states: RwLock::new(HashMap::new()),
        }
    }

    // -------------------------------------------------------------------------
    // Login state
    // -------------------------------------------------------------------------

    /// Mint a fresh OAuth `state` value and remember it.
    pub fn begin_login(&self) -> String {
        let state = uuid::Uuid::new_v4().simple().to_string();
        let now = Utc::now();
        let mut pending = self.pending_states.write();
        pending.retain(|_, issued| now - *issued < Duration::minutes(LOGIN_STATE_TTL_MINUTES));
        pending.insert(state.clone(), now);
        state
    }

    /// Consume a `state` value. Returns `false` if unknown or expired.
    pub fn take_login_state(&self, state: &str) -> bool {
        match self.pending_states.write().remove(state) {
            Some(issued) => Utc::now() - issued < Duration::minutes(LOGIN_STATE_TTL_MINUTES),
            None => false,
        }
    }

    // -------------------------------------------------------------------------
    // Sessions
    // -------------------------------------------------------------------------

    /// Create a session for `user` and return the signed cookie value.
    /// Expired sessions are dropped first.
    pub fn create(&self, user: UserProfile) -> String {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let now = Utc::now();
        let mut sessions = self.sessions.write();

        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now));
        let swept = before - sessions.len();
        if swept > 0 {
            debug!(swept, "expired sessions dropped");
        }

        info!(sub = %user.sub, "session created");
        sessions.insert(
            id.clone(),
            Session {
                user,
                created_at: now,
            },
        );
        format!("{}.{}", id, self.sign(&id))
    }

    /// Look up the session behind a signed cookie value. An expired session
    /// is removed and reported as absent.
    pub fn resolve(&self, cookie_value: &str) -> Option<Session> {
        let id = self.verify(cookie_value)?;
        let session = self.sessions.read().get(id).cloned()?;
        if session.is_expired(Utc::now()) {
            self.sessions.write().remove(id);
            debug!(sub = %session.user.sub, "session expired");
            return None;
        }
        Some(session)
    }

    /// Drop the session behind a signed cookie value, if any.
    pub fn destroy(&self, cookie_value: &str) -> bool {
        let Some(id) = self.verify(cookie_value) else {
            return false;
        };
        match self.sessions.write().remove(id) {
            Some(session) => {
                let age_secs = (Utc::now() - session.created_at).num_seconds();
                debug!(sub = %session.user.sub, age_secs, "session destroyed");
                true
            }
            None => false,
        }
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.read().len()
    }

    // -------------------------------------------------------------------------
    // Signing
    // -------------------------------------------------------------------------

    fn sign(&self, id: &str) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key size");
        mac.update(id.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Return the session id if the signature matches.
    fn verify<'a>(&self, cookie_value: &'a str) -> Option<&'a str> {
        let (id, sig) = cookie_value.split_once('.')?;
        if id.is_empty() {
            return None;
        }
        let expected = self.sign(id);
        constant_time_eq(sig.as_bytes(), expected.as_bytes()).then_some(id)
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("secret", &"<redacted>")
            .field("sessions", &self.sessions.read().len())
            .field("pending_states", &self.pending_states.read().len())
            .finish()
    }
}

/// Compare two byte slices in constant time. Returns `true` if identical.
/// Every byte of both slices is examined even after a mismatch.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        // A length mismatch is observable anyway; the expected signature
        // length is fixed and public.
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

/// Extract the session cookie value from a `Cookie` header list.
pub fn session_cookie_from_headers(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get_all(axum::http::header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

/// `Set-Cookie` value that installs a session.
pub fn session_set_cookie(value: &str) -> String {
    format!(
        "{SESSION_COOKIE}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_TTL_HOURS * 3600
    )
}

/// `Set-Cookie` value that clears the session cookie.
pub fn session_clear_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

// =============================================================================
// Tests
// =============================================================================
