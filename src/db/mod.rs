//! Driver abstraction layer.
//!
//! The wire protocol lives outside this crate. A [`Driver`] turns a connection
//! string plus pre-connect attributes into an [`Engine`], the engine opens
//! [`Connection`]s, and a connection runs SQL into a materialized
//! [`QueryResult`]. The query path owns exactly one engine and one connection
//! per attempt.

mod mock;
mod types;

pub use mock::{DriverStats, RecordedConnect, ScriptedDriver, ScriptedOutcome};
pub use types::{ColumnInfo, QueryResult, Row, RowRef, Value};

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Class of a driver failure, mirroring the DB-API exception hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverErrorKind {
    /// Malformed SQL, missing object, permission on an object. Deterministic.
    Programming,
    /// Network drop, login timeout, server busy.
    Operational,
    /// Driver manager or driver-level failure.
    Interface,
}

impl DriverErrorKind {
    /// Returns the kind as a string for display purposes.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Programming => "programming error",
            Self::Operational => "operational error",
            Self::Interface => "interface error",
        }
    }
}

impl fmt::Display for DriverErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised by a driver, engine or connection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct DriverError {
    /// Failure class.
    pub kind: DriverErrorKind,
    /// Driver-supplied detail, preserved verbatim.
    pub message: String,
}

impl DriverError {
    /// Creates a driver error of the given kind.
    pub fn new(kind: DriverErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates a programming (schema/syntax) error.
    pub fn programming(message: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::Programming, message)
    }

    /// Creates an operational (connectivity) error.
    pub fn operational(message: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::Operational, message)
    }

    /// Creates an interface error.
    pub fn interface(message: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::Interface, message)
    }

    /// Returns true for schema/syntax-class failures that retrying cannot fix.
    ///
    /// Everything else is treated as connectivity and retried; there is no
    /// finer split (e.g. DNS failure vs timeout).
    pub fn is_fatal(&self) -> bool {
        self.kind == DriverErrorKind::Programming
    }
}

/// Result type for driver calls.
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Attributes applied to the connection before login, keyed by driver option number.
///
/// Values usually carry credentials, so `Debug` prints keys and sizes only.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ConnectAttributes(BTreeMap<i32, Vec<u8>>);

impl ConnectAttributes {
    /// Creates an empty attribute set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an attribute, replacing any previous value for the key.
    pub fn insert(&mut self, key: i32, value: impl Into<Vec<u8>>) {
        self.0.insert(key, value.into());
    }

    /// Returns the value for a key.
    pub fn get(&self, key: i32) -> Option<&[u8]> {
        self.0.get(&key).map(Vec::as_slice)
    }

    /// Iterates over attributes in key order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, &[u8])> {
        self.0.iter().map(|(k, v)| (*k, v.as_slice()))
    }
}

impl fmt::Debug for ConnectAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.0.iter().map(|(k, v)| (k, format!("<{} bytes>", v.len()))))
            .finish()
    }
}

/// Entry point of a SQL driver.
pub trait Driver: Send + Sync {
    /// Creates an engine for the given connection string.
    ///
    /// Engines are lazy: no network traffic happens until [`Engine::connect`].
    fn create_engine(
        &self,
        connection_string: &str,
        attrs_before: ConnectAttributes,
    ) -> DriverResult<Box<dyn Engine>>;
}

/// Owner of driver-level resources for one connection string.
#[async_trait]
pub trait Engine: Send {
    /// Opens a connection, performing login.
    async fn connect(&mut self) -> DriverResult<Box<dyn Connection>>;

    /// Releases everything the engine holds.
    async fn dispose(&mut self) -> DriverResult<()>;
}

/// A live connection to the warehouse.
#[async_trait]
pub trait Connection: Send {
    /// Executes SQL and materializes the full result set.
    async fn query(&mut self, sql: &str) -> DriverResult<QueryResult>;

    /// Closes the connection.
    async fn close(&mut self) -> DriverResult<()>;
}
