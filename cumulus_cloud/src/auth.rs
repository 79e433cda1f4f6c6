//! OAuth2 client-credentials token source.
//!
//! Tokens are fetched from the platform's token endpoint with the client id
//! and secret as HTTP basic auth, cached, and refreshed shortly before they
//! expire. Every API request asks this source for a bearer token.

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;

/// Refresh this long before the reported expiry.
const EXPIRY_SLACK_SECS: i64 = 30;

/// Assumed lifetime when the endpoint does not report `expires_in`.
const DEFAULT_TTL_SECS: i64 = 300;

pub struct TokenSource {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    cached: Mutex<Option<CachedToken>>,
}

struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: i64,
}

impl TokenSource {
    pub fn new(
        http: reqwest::Client,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            http,
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            cached: Mutex::new(None),
        }
    }

    /// Current bearer token, fetching a fresh one if the cache is empty or
    /// close to expiry.
    pub async fn bearer(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if Utc::now() + Duration::seconds(EXPIRY_SLACK_SECS) < token.expires_at {
                return Ok(token.token.clone());
            }
        }

        let fresh = self.fetch().await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }

    async fn fetch(&self) -> Result<CachedToken> {
        tracing::debug!(token_url = %self.token_url, "requesting access token");
        let response = self
            .http
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() >= 400 {
            let body = response.bytes().await.unwrap_or_default();
            return Err(Error::from_response(status, &body));
        }

        let body: TokenResponse = response.json().await?;
        let ttl = if body.expires_in > 0 {
            body.expires_in
        } else {
            DEFAULT_TTL_SECS
        };
        Ok(CachedToken {
            token: body.access_token,
            expires_at: Utc::now() + Duration::seconds(ttl),
        })
    }
}
