//! Client secret storage in the OS keyring.

use crate::error::{ReaderError, Result};
use keyring::Entry;
use tracing::warn;

const SERVICE_NAME: &str = "synapse-reader";

/// Stores service principal secrets in the OS keyring.
#[derive(Debug, Clone, Default)]
pub struct SecretStorage;

impl SecretStorage {
    /// Creates a new secret storage handle.
    pub fn new() -> Self {
        Self
    }

    fn entry(key: &str) -> Result<Entry> {
        Entry::new(SERVICE_NAME, key)
            .map_err(|e| ReaderError::secret(format!("Failed to access keyring: {e}")))
    }

    /// Stores a secret under `key`.
    pub fn store(&self, key: &str, secret: &str) -> Result<()> {
        Self::entry(key)?
            .set_password(secret)
            .map_err(|e| ReaderError::secret(format!("Failed to store secret: {e}")))
    }

    /// Retrieves a secret, or `None` if nothing is stored.
    pub fn retrieve(&self, key: &str) -> Result<Option<String>> {
        match Self::entry(key)?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(ReaderError::secret(format!("Failed to retrieve secret: {e}"))),
        }
    }

    /// Deletes a secret. Missing entries are not an error.
    pub fn delete(&self, key: &str) -> Result<()> {
        match Self::entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => {
                warn!("Failed to delete secret from keyring: {e}");
                Ok(())
            }
        }
    }

    /// Generates the keyring key for a client secret.
    pub fn client_secret_key(client_id: &str) -> String {
        format!("client-secret:{client_id}")
    }

    /// Masks a secret for display, showing only the last 4 characters.
    pub fn mask_secret(secret: &str) -> String {
        let chars: Vec<char> = secret.chars().collect();
        if chars.len() <= 4 {
            "*".repeat(chars.len())
        } else {
            let tail: String = chars[chars.len() - 4..].iter().collect();
            format!("****...{tail}")
        }
    }
}
