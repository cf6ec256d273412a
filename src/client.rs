//! Warehouse client facade.
//!
//! Bundles the connection settings, driver, token provider, observer and
//! default retry policy so callers only pass SQL and a cancellation token.

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::auth::TokenProvider;
use crate::config::ConnectionConfig;
use crate::db::{Driver, QueryResult};
use crate::error::{ReaderError, Result};
use crate::query::{QueryExecutor, ReadObserver, RetryController, RetryPolicy, TracingObserver};

const LIST_TABLES_SQL: &str = "SELECT TABLE_SCHEMA, TABLE_NAME \
     FROM INFORMATION_SCHEMA.TABLES \
     WHERE TABLE_TYPE = 'BASE TABLE' \
     ORDER BY TABLE_SCHEMA, TABLE_NAME";

/// A schema-qualified table name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TableName {
    pub schema: String,
    pub name: String,
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// Token-authenticated, retrying client for one warehouse.
pub struct WarehouseClient {
    config: ConnectionConfig,
    driver: Arc<dyn Driver>,
    tokens: Arc<dyn TokenProvider>,
    observer: Arc<dyn ReadObserver>,
    policy: RetryPolicy,
}

impl WarehouseClient {
    /// Creates a client that logs through `tracing` and uses the default retry policy.
    pub fn new(
        config: ConnectionConfig,
        driver: Arc<dyn Driver>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            config,
            driver,
            tokens,
            observer: Arc::new(TracingObserver),
            policy: RetryPolicy::default(),
        }
    }

    /// Replaces the observer notified of attempts and durations.
    pub fn with_observer(mut self, observer: Arc<dyn ReadObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Replaces the default retry policy.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the connection settings.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Returns the default retry policy.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs a query under the client's default policy.
    pub async fn read(&self, sql: &str, cancel: &CancellationToken) -> Result<QueryResult> {
        self.read_with(sql, &self.policy, cancel).await
    }

    /// Runs a query under an explicit policy.
    pub async fn read_with(
        &self,
        sql: &str,
        policy: &RetryPolicy,
        cancel: &CancellationToken,
    ) -> Result<QueryResult> {
        let executor = QueryExecutor::new(self.driver.as_ref(), &self.config);
        RetryController::new(executor, self.tokens.as_ref(), self.observer.as_ref())
            .read(sql, policy, cancel)
            .await
    }

    /// Lists base tables visible to the service principal.
    ///
    /// An empty warehouse is a valid answer, so zero rows are never retried here.
    pub async fn list_tables(&self, cancel: &CancellationToken) -> Result<Vec<TableName>> {
        let policy = self.policy.with_retry_on_zero(false);
        let result = self.read_with(LIST_TABLES_SQL, &policy, cancel).await?;

        result
            .iter_rows()
            .map(|row| {
                let schema = row.get("TABLE_SCHEMA").and_then(|v| v.as_str());
                let name = row.get("TABLE_NAME").and_then(|v| v.as_str());
                match (schema, name) {
                    (Some(schema), Some(name)) => Ok(TableName {
                        schema: schema.to_string(),
                        name: name.to_string(),
                    }),
                    _ => Err(ReaderError::internal(
                        "INFORMATION_SCHEMA.TABLES returned an unexpected shape",
                    )),
                }
            })
            .collect()
    }
}
