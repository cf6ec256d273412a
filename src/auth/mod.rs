//! Access token acquisition.
//!
//! The retry loop asks a [`TokenProvider`] for a token on every attempt.
//! Providers decide whether that means a network call or a cached value.

mod claims;
mod client_credentials;
mod secrets;

pub use claims::{decode_claims, TokenClaims};
pub use client_credentials::{ClientCredentialsConfig, ClientCredentialsProvider};
pub use secrets::SecretStorage;

use async_trait::async_trait;
use std::fmt;
use std::time::{Duration, SystemTime};

use crate::error::Result;

/// Source of OAuth access tokens for the warehouse.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns a token that is valid now.
    ///
    /// Fails with `ReaderError::Authentication` when no token can be obtained.
    async fn get_token(&self) -> Result<AccessToken>;
}

/// An OAuth bearer token.
///
/// `Debug` never prints the token itself.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    secret: String,
    expires_at: Option<SystemTime>,
}

impl AccessToken {
    /// Creates a token with unknown expiry.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            expires_at: None,
        }
    }

    /// Creates a token, reading expiry from its JWT `exp` claim when present.
    pub fn from_jwt(secret: impl Into<String>) -> Self {
        let secret = secret.into();
        let expires_at = decode_claims(&secret)
            .ok()
            .and_then(|claims| claims.expires_at());
        Self { secret, expires_at }
    }

    /// Sets the expiry.
    pub fn with_expiry(mut self, expires_at: SystemTime) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Returns the raw token string.
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Returns the expiry, if known.
    pub fn expires_at(&self) -> Option<SystemTime> {
        self.expires_at
    }

    /// True if the token expires within `margin` from now. Unknown expiry never expires.
    pub fn expires_within(&self, margin: Duration) -> bool {
        match self.expires_at {
            Some(at) => SystemTime::now() + margin >= at,
            None => false,
        }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &format_args!("<{} chars>", self.secret.len()))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Serves a token acquired elsewhere.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: AccessToken,
}

impl StaticTokenProvider {
    /// Creates a provider that always returns `token`.
    pub fn new(token: AccessToken) -> Self {
        Self { token }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn get_token(&self) -> Result<AccessToken> {
        if self.token.expires_within(Duration::ZERO) {
            return Err(crate::error::ReaderError::authentication(
                "static access token has expired",
            ));
        }
        Ok(self.token.clone())
    }
}
