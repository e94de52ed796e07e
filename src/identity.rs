// =============================================================================
// Identity Provider Client — OAuth 2.0 authorization-code flow
// =============================================================================
//
// Only the three calls the login flow needs: build the authorize redirect,
// exchange the returned code for an access token, fetch the user profile.
// =============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::config::OAuthEndpoints;
use crate::session::UserProfile;

const SCOPES: &str = "openid email profile";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Clone)]
pub struct IdentityClient {
    client_id: String,
    client_secret: String,
    endpoints: OAuthEndpoints,
    client: reqwest::Client,
}

impl IdentityClient {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        endpoints: OAuthEndpoints,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build identity HTTP client")?;

        Ok(Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            endpoints,
            client,
        })
    }

    /// URL the browser is redirected to for login.
    pub fn authorize_url(&self, state: &str) -> Result<Url> {
        Url::parse_with_params(
            &self.endpoints.authorize_url,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.endpoints.redirect_url.as_str()),
                ("response_type", "code"),
                ("scope", SCOPES),
                ("state", state),
            ],
        )
        .context("invalid OAuth authorize_url")
    }

    /// Exchange an authorization `code` for the signed-in user's profile.
    #[instrument(skip(self, code), name = "identity::complete_login")]
    pub async fn complete_login(&self, code: &str) -> Result<UserProfile> {
        let token = self.exchange_code(code).await?;
        self.user_profile(&token).await
    }

    async fn exchange_code(&self, code: &str) -> Result<String> {
        let resp = self
            .client
            .post(&self.endpoints.token_url)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.endpoints.redirect_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .context("POST token request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("OAuth token endpoint returned {}: {}", status, body);
        }

        let token: TokenResponse = resp
            .json()
            .await
            .context("failed to parse token response")?;
        debug!("authorization code exchanged");
        Ok(token.access_token)
    }

    async fn user_profile(&self, access_token: &str) -> Result<UserProfile> {
        let resp = self
            .client
            .get(&self.endpoints.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .context("GET userinfo request failed")?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("OAuth userinfo endpoint returned {}", status);
        }

        let profile: UserProfile = resp
            .json()
            .await
            .context("failed to parse userinfo response")?;
        Ok(profile)
    }
}

impl std::fmt::Debug for IdentityClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityClient")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("endpoints", &self.endpoints)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> IdentityClient {
        IdentityClient::new(
            "my-client",
            "my-secret",
            OAuthEndpoints::default(),
            Duration::from_secs(1),
        )
        .unwrap()
    }

    #[test]
    fn authorize_url_carries_flow_parameters() {
        let url = client().authorize_url("abc123").unwrap();
        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(params["client_id"], "my-client");
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["scope"], "openid email profile");
        assert_eq!(params["state"], "abc123");
        assert_eq!(params["redirect_uri"], "http://localhost:3000/auth/google/callback");
        assert!(!url.as_str().contains("my-secret"));
    }

    #[test]
    fn userinfo_parses_minimal_profile() {
        let profile: UserProfile = serde_json::from_str(r#"{ "sub": "42" }"#).unwrap();
        assert_eq!(profile.sub, "42");
        assert!(profile.email.is_none());
    }

    #[test]
    fn debug_redacts_secret() {
        assert!(!format!("{:?}", client()).contains("my-secret"));
    }
}
