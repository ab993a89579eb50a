//! OAuth-style token lifecycle for the v2 Standard Checkout API.
//!
//! Tokens move `Unauthenticated -> Valid -> Expired -> Valid` and are
//! refreshed lazily, just before an authenticated call. The cache lock is
//! held across the refresh round trip so at most one refresh is in flight;
//! concurrent callers observe either the old-valid token or the fully
//! replaced one.

use chrono::{DateTime, Duration, TimeZone, Utc};
use http::HeaderMap;
use http::header::ACCEPT;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::credentials::ClientCredentials;
use crate::errors::{PgError, PgResult};
use crate::transport::Transport;

const DEFAULT_TTL_SECS: i64 = 3600;
const GRANT_TYPE: &str = "client_credentials";

/// A bearer token as issued by the identity service. Replaced wholesale on
/// refresh; lives only in process memory.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub access_token: String,
    pub encrypted_access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Value for the `Authorization` header, e.g. `O-Bearer <token>`.
    pub fn authorization_value(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

#[derive(Debug, Serialize)]
struct TokenForm<'a> {
    client_id: &'a str,
    client_version: u32,
    client_secret: &'a str,
    grant_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    encrypted_access_token: Option<String>,
    refresh_token: Option<String>,
    token_type: Option<String>,
    /// Epoch seconds; the identity service sends this on success.
    expires_at: Option<i64>,
    /// Fallback TTL when `expires_at` is absent.
    expires_in: Option<i64>,
}

impl TokenResponse {
    fn into_token(self, now: DateTime<Utc>) -> AccessToken {
        let expires_at = self
            .expires_at
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .unwrap_or_else(|| now + Duration::seconds(self.expires_in.unwrap_or(DEFAULT_TTL_SECS)));
        AccessToken {
            access_token: self.access_token,
            encrypted_access_token: self.encrypted_access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type.unwrap_or_else(|| "O-Bearer".to_string()),
            expires_at,
        }
    }
}

#[derive(Debug)]
pub struct TokenManager {
    credentials: ClientCredentials,
    token_url: String,
    cached: Mutex<Option<AccessToken>>,
}

impl TokenManager {
    pub fn new(credentials: ClientCredentials, token_url: String) -> Self {
        TokenManager {
            credentials,
            token_url,
            cached: Mutex::new(None),
        }
    }

    /// Return the cached token while it is still valid, otherwise acquire a
    /// fresh one. A failed acquisition leaves any previously cached token in
    /// place, so a still-valid token is never lost to a transient failure.
    pub async fn ensure_token(&self, transport: &Transport) -> PgResult<AccessToken> {
        let mut guard = self.cached.lock().await;
        let now = Utc::now();

        if let Some(token) = guard.as_ref()
            && token.is_valid_at(now)
        {
            return Ok(token.clone());
        }

        let token = self.fetch_token(transport, now).await?;
        *guard = Some(token.clone());
        Ok(token)
    }

    async fn fetch_token(&self, transport: &Transport, now: DateTime<Utc>) -> PgResult<AccessToken> {
        debug!(url = %self.token_url, "acquiring access token");
        let form = TokenForm {
            client_id: &self.credentials.client_id,
            client_version: self.credentials.client_version,
            client_secret: &self.credentials.client_secret,
            grant_type: GRANT_TYPE,
        };

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, "application/json".parse().map_err(|_| {
            PgError::Auth("Invalid accept header".to_string())
        })?);

        let response: TokenResponse = transport
            .post_form(&self.token_url, headers, &form)
            .await
            .map_err(|e| PgError::Auth(format!("Token acquisition failed: {e}")))?;

        Ok(response.into_token(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_json(s: &str) -> TokenResponse {
        serde_json::from_str(s).unwrap()
    }

    #[test]
    fn test_expiry_prefers_expires_at() {
        let now = Utc::now();
        let token = response_json(
            r#"{"access_token":"t","token_type":"O-Bearer","expires_at":1700000000}"#,
        )
        .into_token(now);
        assert_eq!(token.expires_at, Utc.timestamp_opt(1700000000, 0).unwrap());
    }

    #[test]
    fn test_expiry_falls_back_to_expires_in() {
        let now = Utc::now();
        let token = response_json(r#"{"access_token":"t","expires_in":120}"#).into_token(now);
        assert_eq!(token.expires_at, now + Duration::seconds(120));
    }

    #[test]
    fn test_expiry_defaults_to_one_hour() {
        let now = Utc::now();
        let token = response_json(r#"{"access_token":"t"}"#).into_token(now);
        assert_eq!(token.expires_at, now + Duration::seconds(DEFAULT_TTL_SECS));
        assert_eq!(token.token_type, "O-Bearer");
    }

    #[test]
    fn test_validity_window() {
        let now = Utc::now();
        let token = AccessToken {
            access_token: "t".to_string(),
            encrypted_access_token: None,
            refresh_token: None,
            token_type: "O-Bearer".to_string(),
            expires_at: now + Duration::seconds(1),
        };
        assert!(token.is_valid_at(now));
        assert!(!token.is_valid_at(now + Duration::seconds(1)));
        assert!(!token.is_valid_at(now + Duration::seconds(2)));
    }

    #[test]
    fn test_authorization_value_uses_token_type() {
        let token = AccessToken {
            access_token: "abc".to_string(),
            encrypted_access_token: None,
            refresh_token: None,
            token_type: "O-Bearer".to_string(),
            expires_at: Utc::now(),
        };
        assert_eq!(token.authorization_value(), "O-Bearer abc");
    }
}
