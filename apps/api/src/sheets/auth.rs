//! Google service-account authentication (OAuth 2.0 JWT bearer grant).
//!
//! The assertion is an RS256 JWT signed with the account's PKCS#8 key; the
//! resulting access token is cached until shortly before it expires.

use std::path::Path;

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use ring::rand::SystemRandom;
use ring::signature::{RsaKeyPair, RSA_PKCS1_SHA256};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::debug;

use crate::sheets::SheetsError;

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const TOKEN_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SheetsError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| SheetsError::Auth(format!("cannot read {}: {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| SheetsError::Auth(format!("invalid key file {}: {e}", path.display())))
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

pub struct ServiceAccountAuth {
    key: ServiceAccountKey,
    key_pair: RsaKeyPair,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    pub fn new(key: ServiceAccountKey, http: reqwest::Client) -> Result<Self, SheetsError> {
        let der = pem_to_der(&key.private_key)?;
        let key_pair = RsaKeyPair::from_pkcs8(&der)
            .map_err(|e| SheetsError::Auth(format!("rejected private key: {e}")))?;
        Ok(Self {
            key,
            key_pair,
            http,
            cached: Mutex::new(None),
        })
    }

    /// Returns a valid access token, exchanging a fresh assertion when needed.
    pub async fn access_token(&self) -> Result<String, SheetsError> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now();
        if let Some(token) = cached.as_ref() {
            if token.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > now {
                return Ok(token.value.clone());
            }
        }

        let assertion = self.signed_assertion(now)?;
        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SheetsError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let token: TokenResponse = response.json().await?;
        let lifetime = token.expires_in.unwrap_or(TOKEN_LIFETIME_SECS);
        debug!("Obtained Sheets access token valid for {lifetime}s");
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: now + Duration::seconds(lifetime),
        });
        Ok(token.access_token)
    }

    fn signed_assertion(&self, now: DateTime<Utc>) -> Result<String, SheetsError> {
        let signing_input = unsigned_jwt(&self.key, now);
        let mut signature = vec![0u8; self.key_pair.public().modulus_len()];
        self.key_pair
            .sign(
                &RSA_PKCS1_SHA256,
                &SystemRandom::new(),
                signing_input.as_bytes(),
                &mut signature,
            )
            .map_err(|_| SheetsError::Auth("RSA signing failed".to_string()))?;
        Ok(format!(
            "{signing_input}.{}",
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }
}

/// `header.claims`, both base64url without padding.
fn unsigned_jwt(key: &ServiceAccountKey, now: DateTime<Utc>) -> String {
    let header = json!({"alg": "RS256", "typ": "JWT"});
    let iat = now.timestamp();
    let claims = json!({
        "iss": key.client_email,
        "scope": SHEETS_SCOPE,
        "aud": key.token_uri,
        "iat": iat,
        "exp": iat + TOKEN_LIFETIME_SECS,
    });
    format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header.to_string()),
        URL_SAFE_NO_PAD.encode(claims.to_string())
    )
}

fn pem_to_der(pem: &str) -> Result<Vec<u8>, SheetsError> {
    let body: String = pem
        .lines()
        .map(str::trim)
        .filter(|l| !l.starts_with("-----"))
        .collect();
    if body.is_empty() {
        return Err(SheetsError::Auth("private key is empty".to_string()));
    }
    STANDARD
        .decode(body)
        .map_err(|e| SheetsError::Auth(format!("private key is not valid base64: {e}")))
}
