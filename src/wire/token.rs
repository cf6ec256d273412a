//! Access token marshalling for the SQL Server ODBC driver.
//!
//! The driver's access-token connection attribute expects an `ACCESSTOKEN`
//! struct: a 4-byte little-endian length followed by the token widened to
//! two bytes per character.

use std::fmt;

use crate::error::{ReaderError, Result};

/// ODBC connection attribute key for `SQL_COPT_SS_ACCESS_TOKEN`.
pub const SQL_COPT_SS_ACCESS_TOKEN: i32 = 1256;

/// Size of the length prefix in bytes.
const PREFIX_LEN: usize = 4;

/// A token in the driver's expected wire layout.
///
/// Holds credential material, so `Debug` only shows the length.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedToken(Vec<u8>);

impl EncodedToken {
    /// Returns the full encoding, length prefix included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length of the widened payload (excluding the prefix).
    pub fn payload_len(&self) -> usize {
        self.0.len() - PREFIX_LEN
    }
}

impl fmt::Debug for EncodedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncodedToken(<{} bytes>)", self.0.len())
    }
}

/// Encodes an access token into the length-prefixed, widened layout.
///
/// Every UTF-8 byte is followed by a zero byte. This is only a correct
/// UTF-16LE expansion for ASCII tokens, which JWTs always are.
pub fn encode_token(token: &str) -> Result<EncodedToken> {
    let bytes = token.as_bytes();
    let expanded_len = bytes
        .len()
        .checked_mul(2)
        .and_then(|n| i32::try_from(n).ok())
        .ok_or_else(|| {
            ReaderError::encoding(format!(
                "token of {} bytes does not fit the driver's length prefix",
                bytes.len()
            ))
        })?;

    let mut out = Vec::with_capacity(PREFIX_LEN + bytes.len() * 2);
    out.extend_from_slice(&expanded_len.to_le_bytes());
    for &b in bytes {
        out.push(b);
        out.push(0);
    }

    Ok(EncodedToken(out))
}

/// Decodes an encoded token back into its string form.
///
/// Only round-trips tokens produced by [`encode_token`] from ASCII input.
pub fn decode_token(encoded: &[u8]) -> Result<String> {
    if encoded.len() < PREFIX_LEN {
        return Err(ReaderError::encoding("encoded token is missing its length prefix"));
    }

    let (prefix, payload) = encoded.split_at(PREFIX_LEN);
    let declared = i32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]);

    if usize::try_from(declared).ok() != Some(payload.len()) {
        return Err(ReaderError::encoding(format!(
            "length prefix {declared} does not match payload of {} bytes",
            payload.len()
        )));
    }

    let narrowed: Vec<u8> = payload
        .chunks_exact(2)
        .map(|pair| {
            if pair[1] != 0 {
                Err(ReaderError::encoding("payload is not a widened ASCII token"))
            } else {
                Ok(pair[0])
            }
        })
        .collect::<Result<_>>()?;

    String::from_utf8(narrowed)
        .map_err(|e| ReaderError::encoding(format!("decoded token is not UTF-8: {e}")))
}
