//! Upstream credential acquisition
//!
//! The upstream API authenticates with short-lived bearer tokens issued by an
//! account-credentials OAuth grant. `TokenProvider` owns the cached token and
//! refreshes it when fewer than 30 seconds of validity remain. The cache sits
//! behind a `tokio::sync::Mutex` that stays held across the refresh request,
//! so concurrent callers share one in-flight refresh instead of issuing
//! duplicate token requests.

use serde::Deserialize;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;

const USER_AGENT: &str = "rechub/0.1.0";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Refresh this long before the upstream expiry, so a token handed out here
/// is never on the verge of dying mid-request.
const EXPIRY_MARGIN: Duration = Duration::from_secs(30);

/// Ceiling on the honored token lifetime; an absurd upstream `expires_in`
/// is clamped here so the expiry instant cannot overflow.
const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(86_400);

/// Token acquisition errors
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Token endpoint error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Upstream credentials not configured: {0}")]
    Missing(&'static str),
}

/// Token endpoint response (account-credentials grant)
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Validity in seconds from issuance
    expires_in: u64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    /// A token is served from cache while more than the refresh margin of
    /// validity remains at `now`.
    fn is_fresh(&self, now: Instant) -> bool {
        now + EXPIRY_MARGIN < self.expires_at
    }
}

/// Expiry-aware bearer token cache
///
/// One provider instance is shared by every path that talks to the live
/// upstream; construction is cheap and teardown is `Drop`.
pub struct TokenProvider {
    http: reqwest::Client,
    auth_base_url: String,
    account_id: String,
    client_id: String,
    client_secret: String,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn new(
        auth_base_url: impl Into<String>,
        account_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self, TokenError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TokenError::Network(e.to_string()))?;

        Ok(Self {
            http,
            auth_base_url: auth_base_url.into(),
            account_id: account_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            cached: Mutex::new(None),
        })
    }

    /// Get a valid bearer token, from cache when possible
    pub async fn bearer(&self) -> Result<String, TokenError> {
        // Held across the refresh: concurrent callers block here and pick up
        // the token the first one fetched.
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.is_fresh(Instant::now()) {
                return Ok(token.access_token.clone());
            }
            tracing::debug!("Cached token within expiry margin, refreshing");
        }

        let fresh = self.request_token().await?;
        let access_token = fresh.access_token.clone();
        *cached = Some(fresh);

        Ok(access_token)
    }

    async fn request_token(&self) -> Result<CachedToken, TokenError> {
        if self.client_id.trim().is_empty() || self.client_secret.trim().is_empty() {
            return Err(TokenError::Missing("client_id/client_secret"));
        }
        if self.account_id.trim().is_empty() {
            return Err(TokenError::Missing("account_id"));
        }

        let url = format!("{}/oauth/token", self.auth_base_url);

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .query(&[
                ("grant_type", "account_credentials"),
                ("account_id", self.account_id.as_str()),
            ])
            .send()
            .await
            .map_err(|e| TokenError::Network(e.to_string()))?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TokenError::Api(status.as_u16(), body));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| TokenError::Parse(e.to_string()))?;

        tracing::info!(
            expires_in = token.expires_in,
            "Obtained upstream access token"
        );

        let lifetime = Duration::from_secs(token.expires_in).min(MAX_TOKEN_LIFETIME);

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: Instant::now() + lifetime,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_fresh_outside_margin() {
        let now = Instant::now();
        let token = CachedToken {
            access_token: "t".to_string(),
            expires_at: now + Duration::from_secs(3600),
        };
        assert!(token.is_fresh(now));
    }

    #[test]
    fn token_within_margin_is_stale() {
        let now = Instant::now();
        // 10 seconds of validity left, inside the 30-second margin
        let token = CachedToken {
            access_token: "t".to_string(),
            expires_at: now + Duration::from_secs(10),
        };
        assert!(!token.is_fresh(now));
    }

    #[test]
    fn expired_token_is_stale() {
        let now = Instant::now();
        let token = CachedToken {
            access_token: "t".to_string(),
            expires_at: now,
        };
        assert!(!token.is_fresh(now));
    }

    #[tokio::test]
    async fn bearer_rejects_missing_credentials() {
        let provider = TokenProvider::new("http://127.0.0.1:1", "", "", "").unwrap();
        match provider.bearer().await {
            Err(TokenError::Missing(_)) => {}
            other => panic!("expected Missing error, got {:?}", other.map(|_| ())),
        }
    }
}
