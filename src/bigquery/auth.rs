// https://developers.google.com/identity/protocols/oauth2/service-account#httprest

use crate::{ExplorerError, ExplorerResult, ServiceAccountKey};

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use parking_lot::Mutex;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};
use tracing::{debug, info};

pub const BIGQUERY_SCOPE: &str = "https://www.googleapis.com/auth/bigquery";
pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for each signed assertion.
pub const ASSERTION_LIFETIME_SECS: u64 = 3600;

/// A cached token is renewed this long before it expires.
pub const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Claims of the self-signed service-account assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Claims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: u64,
    pub exp: u64,
}

impl Claims {
    pub fn new(key: &ServiceAccountKey, issued_at: u64) -> Self {
        Claims {
            iss: key.client_email.clone(),
            scope: BIGQUERY_SCOPE.to_string(),
            aud: key.token_uri.clone(),
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME_SECS,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    ASSERTION_LIFETIME_SECS
}

/// OAuth error document returned by the token endpoint.
#[derive(Debug, Default, Deserialize)]
struct TokenError {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: String,
}

#[derive(Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    fn is_fresh(&self, now: Instant) -> bool {
        now + REFRESH_MARGIN < self.expires_at
    }
}

/// Exchanges signed assertions for bearer tokens and caches the current one.
pub struct TokenProvider {
    key: ServiceAccountKey,
    http: Client,
    current: Mutex<Option<AccessToken>>,
}

impl fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenProvider")
            .field("client_email", &self.key.client_email)
            .field("token_uri", &self.key.token_uri)
            .finish_non_exhaustive()
    }
}

impl TokenProvider {
    pub fn new(key: ServiceAccountKey, http: Client) -> Self {
        TokenProvider {
            key,
            http,
            current: Mutex::new(None),
        }
    }

    pub fn key(&self) -> &ServiceAccountKey {
        &self.key
    }

    /// Signs the RS256 assertion for `issued_at` (seconds since the epoch).
    pub fn signed_assertion(&self, issued_at: u64) -> ExplorerResult<String> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        let encoding_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())?;
        let claims = Claims::new(&self.key, issued_at);

        Ok(encode(&header, &claims, &encoding_key)?)
    }

    /// Returns a bearer token, exchanging a new assertion when the cached one
    /// is missing or about to expire.
    pub fn token(&self) -> ExplorerResult<String> {
        let mut current = self.current.lock();

        if let Some(token) = current.as_ref().filter(|t| t.is_fresh(Instant::now())) {
            return Ok(token.value.clone());
        }

        let token = self.exchange()?;
        let value = token.value.clone();
        *current = Some(token);
        Ok(value)
    }

    fn exchange(&self) -> ExplorerResult<AccessToken> {
        let issued_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|err| ExplorerError::Other(err.to_string()))?
            .as_secs();

        let assertion = self.signed_assertion(issued_at)?;

        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()?;

        let status = response.status();
        let body = response.text()?;

        if !status.is_success() {
            let detail: TokenError = serde_json::from_str(&body).unwrap_or_default();
            return Err(ExplorerError::Warehouse {
                code: status.as_u16(),
                message: format!("{}: {}", detail.error, detail.error_description),
            });
        }

        let token: TokenResponse = serde_json::from_str(&body)?;
        info!(
            "Obtained access token for '{}' (expires in {}s)",
            self.key.client_email, token.expires_in
        );

        Ok(AccessToken {
            value: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        })
    }

    /// Drops the cached token so the next call performs a fresh exchange.
    pub fn invalidate(&self) {
        debug!("Invalidating cached access token");
        *self.current.lock() = None;
    }
}
