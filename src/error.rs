//! Error types for synapse-reader.
//!
//! Defines the main error enum surfaced to callers. Every failure a caller
//! sees is one of these variants; raw driver errors never leak through.

use thiserror::Error;

/// Main error type for synapse-reader operations.
#[derive(Error, Debug)]
pub enum ReaderError {
    /// Token acquisition failed (bad credentials, unreachable authority, etc.)
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// The access token could not be marshalled into the driver wire format.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Query rejected for structural reasons (bad SQL, missing object).
    #[error("Query error: {0}")]
    FatalQuery(String),

    /// Network or connection failure for a single attempt.
    #[error("Connection error: {0}")]
    TransientConnection(String),

    /// The retry budget was consumed without a usable result.
    #[error("Failed to execute query on {host} after {attempts} attempts.")]
    RetryExhausted { host: String, attempts: u32 },

    /// The caller cancelled the read.
    #[error("Query cancelled")]
    Cancelled,

    /// Configuration errors (invalid config file, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// OS keyring failures.
    #[error("Secret storage error: {0}")]
    Secret(String),

    /// Internal errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReaderError {
    /// Creates an authentication error with the given message.
    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Creates an encoding error with the given message.
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// Creates a fatal query error with the given message.
    pub fn fatal_query(msg: impl Into<String>) -> Self {
        Self::FatalQuery(msg.into())
    }

    /// Creates a transient connection error with the given message.
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::TransientConnection(msg.into())
    }

    /// Creates a retry-exhausted error for the given host.
    pub fn retry_exhausted(host: impl Into<String>, attempts: u32) -> Self {
        Self::RetryExhausted {
            host: host.into(),
            attempts,
        }
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a secret storage error with the given message.
    pub fn secret(msg: impl Into<String>) -> Self {
        Self::Secret(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Authentication(_) => "Authentication Error",
            Self::Encoding(_) => "Encoding Error",
            Self::FatalQuery(_) => "Query Error",
            Self::TransientConnection(_) => "Connection Error",
            Self::RetryExhausted { .. } => "Retry Exhausted",
            Self::Cancelled => "Cancelled",
            Self::Config(_) => "Configuration Error",
            Self::Secret(_) => "Secret Storage Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using ReaderError.
pub type Result<T> = std::result::Result<T, ReaderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_authentication() {
        let err = ReaderError::authentication("invalid_client: AADSTS7000215");
        assert_eq!(
            err.to_string(),
            "Authentication error: invalid_client: AADSTS7000215"
        );
        assert_eq!(err.category(), "Authentication Error");
    }

    #[test]
    fn test_error_display_fatal_query() {
        let err = ReaderError::fatal_query("Invalid object name 'dbo.missing'");
        assert_eq!(
            err.to_string(),
            "Query error: Invalid object name 'dbo.missing'"
        );
        assert_eq!(err.category(), "Query Error");
    }

    #[test]
    fn test_error_display_retry_exhausted() {
        let err = ReaderError::retry_exhausted("myws.sql.azuresynapse.net", 3);
        assert_eq!(
            err.to_string(),
            "Failed to execute query on myws.sql.azuresynapse.net after 3 attempts."
        );
        assert_eq!(err.category(), "Retry Exhausted");
    }

    #[test]
    fn test_error_display_transient() {
        let err = ReaderError::transient("login timeout expired");
        assert_eq!(err.to_string(), "Connection error: login timeout expired");
        assert_eq!(err.category(), "Connection Error");
    }

    #[test]
    fn test_error_display_config() {
        let err = ReaderError::config("missing field 'database' in warehouses.default");
        assert_eq!(
            err.to_string(),
            "Configuration error: missing field 'database' in warehouses.default"
        );
        assert_eq!(err.category(), "Configuration Error");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ReaderError>();
    }
}
