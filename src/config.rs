//! Configuration management for synapse-reader.
//!
//! Handles loading configuration from TOML files and environment variables,
//! with support for named warehouses, OAuth client settings and retry policy.

use crate::error::{ReaderError, Result};
use crate::query::RetryPolicy;
use crate::wire::SQL_COPT_SS_ACCESS_TOKEN;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for synapse-reader.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// OAuth client settings.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Named warehouse connections.
    #[serde(default)]
    pub warehouses: HashMap<String, ConnectionConfig>,

    /// Retry behaviour for reads.
    #[serde(default)]
    pub retry: RetryConfig,
}

/// OAuth client-credentials settings for the service principal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Azure AD tenant.
    pub tenant_id: Option<String>,

    /// Application (client) id.
    pub client_id: Option<String>,

    /// Client secret (prefer AZURE_CLIENT_SECRET or the OS keyring).
    pub client_secret: Option<String>,

    /// Authority URL. Defaults to the public cloud login endpoint for the tenant.
    pub authority: Option<String>,

    /// Scope requested for database access.
    #[serde(default = "default_scope")]
    pub scope: String,
}

fn default_scope() -> String {
    "https://database.windows.net/.default".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            tenant_id: None,
            client_id: None,
            client_secret: None,
            authority: None,
            scope: default_scope(),
        }
    }
}

impl AuthConfig {
    /// Applies AZURE_* environment variables as defaults.
    pub fn apply_env_defaults(&mut self) {
        if self.tenant_id.is_none() {
            self.tenant_id = std::env::var("AZURE_TENANT_ID").ok();
        }
        if self.client_id.is_none() {
            self.client_id = std::env::var("AZURE_CLIENT_ID").ok();
        }
        if self.client_secret.is_none() {
            self.client_secret = std::env::var("AZURE_CLIENT_SECRET").ok();
        }
    }

    /// Returns the authority URL, deriving it from the tenant when unset.
    pub fn authority_url(&self) -> Result<String> {
        if let Some(authority) = &self.authority {
            return Ok(authority.trim_end_matches('/').to_string());
        }

        let tenant = self
            .tenant_id
            .as_deref()
            .ok_or_else(|| ReaderError::config("auth.tenant_id is required"))?;

        Ok(format!("https://login.microsoftonline.com/{tenant}"))
    }

    /// Returns the client id or a configuration error.
    pub fn require_client_id(&self) -> Result<&str> {
        self.client_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ReaderError::config("auth.client_id is required"))
    }
}

/// Connection settings for one warehouse. Immutable once a client is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Warehouse host, e.g. `myworkspace.sql.azuresynapse.net`.
    pub server: String,

    /// Database name.
    pub database: String,

    /// ODBC driver identifier.
    #[serde(default = "default_driver")]
    pub driver: String,

    /// Driver attribute key that receives the encoded token.
    #[serde(default = "default_access_token_attr")]
    pub access_token_attr: i32,

    /// Connection timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u32,
}

fn default_driver() -> String {
    "{ODBC Driver 18 for SQL Server}".to_string()
}

fn default_access_token_attr() -> i32 {
    SQL_COPT_SS_ACCESS_TOKEN
}

fn default_timeout() -> u32 {
    30
}

impl ConnectionConfig {
    /// Creates a config for the given server and database with default driver settings.
    pub fn new(server: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            database: database.into(),
            driver: default_driver(),
            access_token_attr: default_access_token_attr(),
            timeout: default_timeout(),
        }
    }

    /// Builds a config purely from SYNAPSE_SERVER / SYNAPSE_DATABASE.
    pub fn from_env() -> Option<Self> {
        let server = std::env::var("SYNAPSE_SERVER").ok()?;
        let database = std::env::var("SYNAPSE_DATABASE").ok()?;
        Some(Self::new(server, database))
    }

    /// Checks that required fields are present.
    pub fn validate(&self) -> Result<()> {
        if self.server.trim().is_empty() {
            return Err(ReaderError::config("server is required"));
        }
        if self.database.trim().is_empty() {
            return Err(ReaderError::config("database is required"));
        }
        if self.driver.trim().is_empty() {
            return Err(ReaderError::config("driver is required"));
        }
        Ok(())
    }

    /// Returns a display-safe string for logs and CLI output.
    pub fn display_string(&self) -> String {
        format!("{} @ {}", self.database, self.server)
    }
}

/// Retry settings as they appear in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per read.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between attempts, in seconds (fractions allowed).
    #[serde(default = "default_sleep_secs")]
    pub sleep_secs: f64,

    /// Retry when a query returns zero rows.
    #[serde(default)]
    pub retry_on_zero: bool,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_sleep_secs() -> f64 {
    10.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            sleep_secs: default_sleep_secs(),
            retry_on_zero: false,
        }
    }
}

impl RetryConfig {
    /// Converts the file representation into a validated policy.
    pub fn to_policy(&self) -> Result<RetryPolicy> {
        if self.max_attempts == 0 {
            return Err(ReaderError::config("retry.max_attempts must be at least 1"));
        }
        let sleep = Duration::try_from_secs_f64(self.sleep_secs).map_err(|e| {
            ReaderError::config(format!(
                "retry.sleep_secs must be a non-negative number of seconds, got {}: {e}",
                self.sleep_secs
            ))
        })?;

        Ok(RetryPolicy::new()
            .with_max_attempts(self.max_attempts)
            .with_sleep(sleep)
            .with_retry_on_zero(self.retry_on_zero))
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("synapse-reader")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ReaderError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            ReaderError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Gets a named warehouse, or the default warehouse if name is None.
    pub fn get_warehouse(&self, name: Option<&str>) -> Option<&ConnectionConfig> {
        let key = name.unwrap_or("default");
        self.warehouses.get(key)
    }

    /// Resolves the warehouse to use, falling back to the environment.
    pub fn resolve_warehouse(&self, name: Option<&str>) -> Result<ConnectionConfig> {
        if let Some(conn) = self.get_warehouse(name) {
            conn.validate()?;
            return Ok(conn.clone());
        }

        if let Some(name) = name {
            return Err(ReaderError::config(format!(
                "Warehouse '{name}' not found in config file"
            )));
        }

        let conn = ConnectionConfig::from_env().ok_or_else(|| {
            ReaderError::config(
                "No warehouse configured. Add [warehouses.default] or set SYNAPSE_SERVER and SYNAPSE_DATABASE",
            )
        })?;
        conn.validate()?;
        Ok(conn)
    }
}
