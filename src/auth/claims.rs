//! JWT claim inspection.
//!
//! Decodes the payload segment only. Signatures are not verified; the
//! warehouse does that. This is for diagnostics and expiry tracking.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::{ReaderError, Result};

/// The subset of Azure AD access token claims worth showing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Audience (the resource the token is for).
    pub aud: Option<String>,
    /// Issuer.
    pub iss: Option<String>,
    /// Tenant id.
    pub tid: Option<String>,
    /// Application id of the service principal.
    pub appid: Option<String>,
    /// Object id of the service principal.
    pub oid: Option<String>,
    /// Issued-at, seconds since the epoch.
    pub iat: Option<u64>,
    /// Expiry, seconds since the epoch.
    pub exp: Option<u64>,
}

impl TokenClaims {
    /// Returns the expiry as a `SystemTime`.
    pub fn expires_at(&self) -> Option<SystemTime> {
        self.exp.map(|secs| UNIX_EPOCH + Duration::from_secs(secs))
    }
}

/// Decodes the claims of a compact-serialized JWT.
pub fn decode_claims(token: &str) -> Result<TokenClaims> {
    let mut parts = token.split('.');
    let payload = match (parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(payload), Some(_)) => payload,
        _ => return Err(ReaderError::authentication("access token is not a JWT")),
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| ReaderError::authentication(format!("invalid JWT payload encoding: {e}")))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| ReaderError::authentication(format!("invalid JWT claims: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn jwt(claims: &str) -> String {
        format!(
            "{}.{}.signature",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#),
            URL_SAFE_NO_PAD.encode(claims)
        )
    }

    #[test]
    fn test_decode_azure_claims() {
        let token = jwt(
            r#"{"aud":"https://database.windows.net/","tid":"t-1","appid":"app-1","exp":1700000000,"extra":true}"#,
        );
        let claims = decode_claims(&token).unwrap();

        assert_eq!(claims.aud.as_deref(), Some("https://database.windows.net/"));
        assert_eq!(claims.tid.as_deref(), Some("t-1"));
        assert_eq!(claims.appid.as_deref(), Some("app-1"));
        assert_eq!(
            claims.expires_at(),
            Some(UNIX_EPOCH + Duration::from_secs(1_700_000_000))
        );
    }

    #[test]
    fn test_decode_rejects_non_jwt() {
        let err = decode_claims("not-a-jwt").unwrap_err();
        assert!(err.to_string().contains("not a JWT"));
    }

    #[test]
    fn test_decode_rejects_bad_payload() {
        assert!(decode_claims("a.!!!.c").is_err());
        let not_json = format!("a.{}.c", URL_SAFE_NO_PAD.encode("plain"));
        assert!(decode_claims(&not_json).is_err());
    }
}
