//! Single-attempt query execution.

use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::ConnectionConfig;
use crate::db::{ConnectAttributes, Connection, Driver, DriverError, Engine, QueryResult};
use crate::wire::{build_connection_string, EncodedToken};

/// Why a single attempt did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptError {
    /// The driver failed; the error is passed through unchanged.
    Driver(DriverError),
    /// The caller cancelled while the attempt was in flight.
    Cancelled,
}

impl From<DriverError> for AttemptError {
    fn from(e: DriverError) -> Self {
        Self::Driver(e)
    }
}

/// One engine plus at most one connection, owned for a single attempt.
///
/// Must be finished with [`ConnectionHandle::release`].
pub struct ConnectionHandle {
    engine: Option<Box<dyn Engine>>,
    connection: Option<Box<dyn Connection>>,
    released: bool,
}

impl ConnectionHandle {
    /// Wraps a freshly created engine.
    pub fn new(engine: Box<dyn Engine>) -> Self {
        Self {
            engine: Some(engine),
            connection: None,
            released: false,
        }
    }

    /// Opens the connection if needed and runs `sql`.
    pub async fn query(&mut self, sql: &str) -> Result<QueryResult, DriverError> {
        if self.connection.is_none() {
            let engine = self
                .engine
                .as_mut()
                .ok_or_else(|| DriverError::interface("connection handle already released"))?;
            self.connection = Some(engine.connect().await?);
        }

        match self.connection.as_mut() {
            Some(conn) => conn.query(sql).await,
            None => Err(DriverError::interface("connection handle already released")),
        }
    }

    /// Closes the connection, then disposes the engine.
    ///
    /// Failures are logged and dropped so they never replace the attempt's outcome.
    pub async fn release(&mut self) {
        if let Some(mut conn) = self.connection.take() {
            if let Err(e) = conn.close().await {
                warn!("Ignoring error while closing connection: {e}");
            }
        }
        if let Some(mut engine) = self.engine.take() {
            if let Err(e) = engine.dispose().await {
                warn!("Ignoring error while disposing engine: {e}");
            }
        }
        self.released = true;
    }

    /// Returns true once [`release`](Self::release) has run.
    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        if !self.released && (self.engine.is_some() || self.connection.is_some()) {
            warn!("Connection handle dropped without release; driver resources may leak");
        }
    }
}

/// Runs one query attempt against a warehouse.
pub struct QueryExecutor<'a> {
    driver: &'a dyn Driver,
    config: &'a ConnectionConfig,
}

impl<'a> QueryExecutor<'a> {
    /// Creates a new executor.
    pub fn new(driver: &'a dyn Driver, config: &'a ConnectionConfig) -> Self {
        Self { driver, config }
    }

    /// Returns the connection settings this executor targets.
    pub fn config(&self) -> &ConnectionConfig {
        self.config
    }

    /// Executes `sql` exactly once.
    ///
    /// The token goes to the driver through the configured attribute key, not
    /// as a password. The engine and connection are released on every path,
    /// including cancellation.
    pub async fn execute_once(
        &self,
        sql: &str,
        token: &EncodedToken,
        cancel: &CancellationToken,
    ) -> Result<QueryResult, AttemptError> {
        let connection_string = build_connection_string(self.config);
        let mut attrs = ConnectAttributes::new();
        attrs.insert(self.config.access_token_attr, token.as_bytes());

        let engine = self.driver.create_engine(&connection_string, attrs)?;
        let mut handle = ConnectionHandle::new(engine);

        let start = Instant::now();
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AttemptError::Cancelled),
            result = handle.query(sql) => result.map_err(AttemptError::Driver),
        };
        handle.release().await;

        debug!(
            "Attempt against {} finished in {:?}",
            self.config.server,
            start.elapsed()
        );

        outcome
    }
}
