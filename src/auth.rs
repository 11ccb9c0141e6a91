//! Bearer-token acquisition for the Jamf Pro API.
//!
//! The server exchanges HTTP Basic credentials for a short-lived bearer
//! token at `POST api/v1/auth/token`. `TokenProvider` performs that
//! exchange, caches the token with its acquisition time, and reports it
//! absent once a safety buffer before expiry has elapsed, so callers
//! re-acquire before racing the expiry boundary.

use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::catalog::ObjectType;
use crate::error::{Result, ToolError};

/// Connect timeout for the token endpoint. Token requests are small and
/// fast; anything slower indicates a connectivity problem.
const TOKEN_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Overall timeout for a token request round-trip.
const TOKEN_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Server-side bearer tokens live 30 minutes. The expiry field in the
/// response is an RFC 3339 timestamp; rather than parse server clock time
/// we track locally from the acquisition instant.
const TOKEN_LIFETIME_SECS: u64 = 30 * 60;

/// Safety buffer subtracted from the lifetime so the token is refreshed
/// before it actually expires.
const EXPIRY_BUFFER_SECS: u64 = 60;

/// Connection settings and credentials for one Jamf Pro instance.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Server base URL, e.g. `https://example.jamfcloud.com`.
    pub base_url: String,
    /// API account username.
    pub username: String,
    /// API account password.
    pub password: String,
}

/// Subset of the token response that we need. The endpoint also returns an
/// `expires` timestamp which is kept for diagnostics only.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
    #[serde(default)]
    expires: Option<String>,
}

/// Acquires and caches a bearer token for the Jamf Pro API.
///
/// Invariants:
/// - `response` is `None` until the first successful `refresh_token()`.
/// - After a successful refresh, `token()` returns `Some` until the
///   lifetime (minus the safety buffer) has elapsed.
/// - `acquired_at` is always `Some` when `response` is `Some`.
pub struct TokenProvider {
    client: reqwest::Client,
    credentials: Credentials,
    response: Option<TokenResponse>,
    acquired_at: Option<Instant>,
}

impl TokenProvider {
    /// Creates a provider for the given instance. No network I/O happens
    /// until `refresh_token` is called.
    pub fn new(credentials: Credentials) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(TOKEN_CONNECT_TIMEOUT)
            .timeout(TOKEN_REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        TokenProvider {
            client,
            credentials,
            response: None,
            acquired_at: None,
        }
    }

    /// Creates a provider with a pre-set token, bypassing the auth
    /// endpoint. Used by tests to avoid real token acquisition.
    pub fn with_token(token: &str) -> Self {
        TokenProvider {
            client: reqwest::Client::new(),
            credentials: Credentials {
                base_url: String::new(),
                username: String::new(),
                password: String::new(),
            },
            response: Some(TokenResponse {
                token: token.to_string(),
                expires: None,
            }),
            acquired_at: Some(Instant::now()),
        }
    }

    /// Exchanges the Basic credentials for a fresh bearer token and caches
    /// it.
    ///
    /// The body is read as text before the status check so that on failure
    /// the server's diagnostic message is preserved in the error rather
    /// than discarded.
    pub async fn refresh_token(&mut self) -> Result<()> {
        let url = format!(
            "{}/{}",
            self.credentials.base_url.trim_end_matches('/'),
            ObjectType::Token.descriptor().path
        );

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .send()
            .await
            .map_err(|e| ToolError::Auth {
                message: format!("token request to {url} failed"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| ToolError::Auth {
            message: "failed to read token response body".to_string(),
            source: Some(Box::new(e)),
        })?;

        if !status.is_success() {
            return Err(ToolError::Auth {
                message: format!("token request failed ({status}): {body}"),
                source: None,
            });
        }

        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|e| ToolError::Auth {
                message: "failed to parse token response".to_string(),
                source: Some(Box::new(e)),
            })?;
        if let Some(expires) = &parsed.expires {
            tracing::debug!(%expires, "session token received");
        }
        self.acquired_at = Some(Instant::now());
        self.response = Some(parsed);
        Ok(())
    }

    /// Returns `true` if a token exists but has exceeded its effective
    /// lifetime. Returns `false` when no token is cached.
    fn is_expired(&self) -> bool {
        match (&self.response, self.acquired_at) {
            (Some(_), Some(acquired)) => {
                let lifetime = TOKEN_LIFETIME_SECS.saturating_sub(EXPIRY_BUFFER_SECS);
                acquired.elapsed().as_secs() >= lifetime
            }
            _ => false,
        }
    }

    /// The cached bearer token, or `None` if absent or expired.
    pub fn token(&self) -> Option<&str> {
        if self.is_expired() {
            return None;
        }
        self.response.as_ref().map(|r| r.token.as_str())
    }

    /// The credentials this provider was constructed with.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }
}
