use std::time::{Duration, Instant};

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::credentials::ServiceAccount;
use crate::error::ConfigError;

use super::SheetsError;

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Refresh this long before the token actually expires.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize, Deserialize)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    ASSERTION_LIFETIME_SECS as u64
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// OAuth2 access tokens for a service account (JWT bearer grant), cached
/// until shortly before they expire.
pub struct TokenSource {
    client_email: String,
    token_uri: String,
    scope: String,
    header: Header,
    key: EncodingKey,
    http: reqwest::Client,
    cache: Mutex<Option<CachedToken>>,
}

impl TokenSource {
    pub fn new(
        account: &ServiceAccount,
        scope: &str,
        http: reqwest::Client,
    ) -> Result<Self, ConfigError> {
        let key = EncodingKey::from_rsa_pem(account.private_key.as_bytes()).map_err(|e| {
            ConfigError::Invalid(format!("Service account private_key is not a usable RSA key: {e}"))
        })?;

        let mut header = Header::new(Algorithm::RS256);
        header.kid = account.private_key_id.clone();

        Ok(Self {
            client_email: account.client_email.clone(),
            token_uri: account.token_uri.clone(),
            scope: scope.to_string(),
            header,
            key,
            http,
            cache: Mutex::new(None),
        })
    }

    /// Signed assertion for the token endpoint.
    pub fn assertion(&self) -> Result<String, SheetsError> {
        let iat = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: self.client_email.clone(),
            scope: self.scope.clone(),
            aud: self.token_uri.clone(),
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };
        encode(&self.header, &claims, &self.key)
            .map_err(|e| SheetsError::Auth(format!("JWT encode failed: {e}")))
    }

    /// Current access token, exchanging a fresh assertion if the cached one
    /// is missing or about to expire. Callers queue on the cache lock, so a
    /// burst of requests triggers a single exchange.
    pub async fn access_token(&self) -> Result<String, SheetsError> {
        let mut cache = self.cache.lock().await;

        if let Some(token) = cache.as_ref() {
            if token.expires_at > Instant::now() + EXPIRY_MARGIN {
                return Ok(token.access_token.clone());
            }
        }

        let fresh = self.exchange().await?;
        let access_token = fresh.access_token.clone();
        *cache = Some(fresh);
        Ok(access_token)
    }

    /// Drop the cached token, e.g. after the API rejected it.
    pub async fn invalidate(&self) {
        *self.cache.lock().await = None;
    }

    async fn exchange(&self) -> Result<CachedToken, SheetsError> {
        let assertion = self.assertion()?;
        let params = [("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())];

        let resp = self
            .http
            .post(&self.token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|e| SheetsError::Auth(format!("token request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = truncated_body(resp).await;
            return Err(SheetsError::Auth(format!(
                "token endpoint returned {}: {body}",
                status.as_u16()
            )));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| SheetsError::Auth(format!("invalid token response: {e}")))?;

        tracing::debug!(
            "Obtained access token for {} (expires in {}s)",
            self.client_email,
            token.expires_in
        );

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: Instant::now() + token_lifetime(token.expires_in),
        })
    }
}

/// Google never issues tokens that outlive the assertion; anything longer
/// is capped so the expiry instant cannot overflow.
fn token_lifetime(expires_in: u64) -> Duration {
    Duration::from_secs(expires_in.min(ASSERTION_LIFETIME_SECS as u64))
}

pub(crate) async fn truncated_body(resp: reqwest::Response) -> String {
    resp.text()
        .await
        .unwrap_or_default()
        .chars()
        .take(1024)
        .collect()
}
