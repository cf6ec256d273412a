//! OAuth2 client-credentials flow against Azure AD.
//!
//! Tokens are cached and reused until they are close to expiry, then a new
//! one is requested from the authority's v2.0 token endpoint.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::fmt;
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::secrets::SecretStorage;
use super::{AccessToken, TokenProvider};
use crate::config::AuthConfig;
use crate::error::{ReaderError, Result};

/// Default timeout for token requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// A cached token is replaced once it is this close to expiry.
const REFRESH_MARGIN: Duration = Duration::from_secs(5 * 60);

/// Settings for the client-credentials grant.
#[derive(Clone)]
pub struct ClientCredentialsConfig {
    /// Authority URL, e.g. `https://login.microsoftonline.com/<tenant>`.
    pub authority: String,
    /// Application (client) id.
    pub client_id: String,
    /// Client secret.
    pub client_secret: String,
    /// Scope to request.
    pub scope: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl fmt::Debug for ClientCredentialsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentialsConfig")
            .field("authority", &self.authority)
            .field("client_id", &self.client_id)
            .field("client_secret", &SecretStorage::mask_secret(&self.client_secret))
            .field("scope", &self.scope)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ClientCredentialsConfig {
    /// Creates a config with the default timeout.
    pub fn new(
        authority: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            authority: authority.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scope: scope.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Builds the config from file/env settings, falling back to the keyring for the secret.
    pub fn from_auth(auth: &AuthConfig, secrets: Option<&SecretStorage>) -> Result<Self> {
        let authority = auth.authority_url()?;
        let client_id = auth.require_client_id()?;

        let client_secret = match &auth.client_secret {
            Some(secret) if !secret.is_empty() => secret.clone(),
            _ => secrets
                .map(|s| s.retrieve(&SecretStorage::client_secret_key(client_id)))
                .transpose()?
                .flatten()
                .ok_or_else(|| {
                    ReaderError::config(format!(
                        "No client secret for '{client_id}'. Set AZURE_CLIENT_SECRET or run `synapse-reader secret set`"
                    ))
                })?,
        };

        Ok(Self::new(authority, client_id, client_secret, &auth.scope))
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Returns the token endpoint URL.
    pub fn token_endpoint(&self) -> String {
        format!("{}/oauth2/v2.0/token", self.authority.trim_end_matches('/'))
    }
}

/// Token provider using a service principal's client secret.
#[derive(Debug)]
pub struct ClientCredentialsProvider {
    config: ClientCredentialsConfig,
    client: Client,
    cached: Mutex<Option<AccessToken>>,
}

impl ClientCredentialsProvider {
    /// Creates a new provider with the given configuration.
    pub fn new(config: ClientCredentialsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                ReaderError::authentication(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            config,
            client,
            cached: Mutex::new(None),
        })
    }

    /// Requests a new token from the authority, bypassing the cache.
    pub async fn acquire_token(&self) -> Result<AccessToken> {
        let endpoint = self.config.token_endpoint();
        debug!("Requesting token from {endpoint} for {}", self.config.client_id);

        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("scope", self.config.scope.as_str()),
        ];

        let response = self
            .client
            .post(&endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|e| ReaderError::authentication(format!("Token request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ReaderError::authentication(format!("Failed to read token response: {e}")))?;

        parse_token_response(status, &body, SystemTime::now())
    }
}

#[async_trait]
impl TokenProvider for ClientCredentialsProvider {
    async fn get_token(&self) -> Result<AccessToken> {
        let mut cached = self.cached.lock().await;

        // A token without a known expiry is never reused.
        if let Some(token) = cached.as_ref() {
            if token.expires_at().is_some() && !token.expires_within(REFRESH_MARGIN) {
                return Ok(token.clone());
            }
        }

        let token = self.acquire_token().await?;
        info!("Acquired access token for client {}", self.config.client_id);
        *cached = Some(token.clone());
        Ok(token)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

/// Turns a token endpoint response into an [`AccessToken`].
fn parse_token_response(status: StatusCode, body: &str, now: SystemTime) -> Result<AccessToken> {
    if !status.is_success() {
        if let Ok(err) = serde_json::from_str::<TokenErrorResponse>(body) {
            let detail = err
                .error_description
                .as_deref()
                .and_then(|d| d.lines().next())
                .unwrap_or_default();
            return Err(ReaderError::authentication(format!(
                "Token acquisition failed: {} {detail}",
                err.error
            )
            .trim_end()
            .to_string()));
        }
        return Err(ReaderError::authentication(format!(
            "Token acquisition failed ({status})"
        )));
    }

    let response: TokenResponse = serde_json::from_str(body)
        .map_err(|e| ReaderError::authentication(format!("Failed to parse token response: {e}")))?;

    let secret = response
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ReaderError::authentication("Token response has no access_token"))?;

    // v1 endpoints send expires_in as a string.
    let expires_in = response.expires_in.and_then(|v| match v {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    });

    Ok(match expires_in {
        Some(secs) => AccessToken::new(secret).with_expiry(now + Duration::from_secs(secs)),
        None => AccessToken::from_jwt(secret),
    })
}
