//! Scripted in-memory driver for testing.
//!
//! Replays a queue of outcomes, one per engine, and counts every engine and
//! connection it hands out so tests can check nothing is leaked.

use super::{
    ColumnInfo, ConnectAttributes, Connection, Driver, DriverError, DriverResult, Engine,
    QueryResult, Value,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// What a scripted attempt does.
#[derive(Debug, Clone)]
pub enum ScriptedOutcome {
    /// The query succeeds with this result.
    Rows(QueryResult),
    /// Login fails with this error.
    ConnectError(DriverError),
    /// The query fails with this error.
    QueryError(DriverError),
    /// The query never completes.
    Hang,
}

impl ScriptedOutcome {
    /// A single-column result with `n` rows.
    pub fn rows(n: usize) -> Self {
        let rows = (0..n).map(|i| vec![Value::Int(i as i64)]).collect();
        Self::Rows(QueryResult::with_data(
            vec![ColumnInfo::new("n", "int")],
            rows,
        ))
    }

    /// A successful query with no rows.
    pub fn empty() -> Self {
        Self::Rows(QueryResult::with_data(
            vec![ColumnInfo::new("n", "int")],
            Vec::new(),
        ))
    }

    /// A connectivity failure during the query.
    pub fn transient(message: &str) -> Self {
        Self::QueryError(DriverError::operational(message))
    }

    /// A schema/syntax failure during the query.
    pub fn fatal(message: &str) -> Self {
        Self::QueryError(DriverError::programming(message))
    }
}

/// Lifecycle counters shared by a driver and everything it created.
#[derive(Debug, Default)]
pub struct DriverStats {
    engines_created: AtomicUsize,
    engines_disposed: AtomicUsize,
    connections_opened: AtomicUsize,
    connections_closed: AtomicUsize,
    queries: AtomicUsize,
}

impl DriverStats {
    /// Engines handed out by `create_engine`.
    pub fn engines_created(&self) -> usize {
        self.engines_created.load(Ordering::SeqCst)
    }

    /// Engines disposed.
    pub fn engines_disposed(&self) -> usize {
        self.engines_disposed.load(Ordering::SeqCst)
    }

    /// Connections successfully opened.
    pub fn connections_opened(&self) -> usize {
        self.connections_opened.load(Ordering::SeqCst)
    }

    /// Connections closed.
    pub fn connections_closed(&self) -> usize {
        self.connections_closed.load(Ordering::SeqCst)
    }

    /// Queries started.
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// True when every engine and connection handed out has been released.
    pub fn all_released(&self) -> bool {
        self.engines_created() == self.engines_disposed()
            && self.connections_opened() == self.connections_closed()
    }
}

/// What the driver was asked to connect with.
#[derive(Debug, Clone)]
pub struct RecordedConnect {
    /// Connection string passed to `create_engine`.
    pub connection_string: String,
    /// Pre-connect attributes passed to `create_engine`.
    pub attrs_before: ConnectAttributes,
}

/// A driver that replays scripted outcomes.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDriver {
    script: Arc<Mutex<VecDeque<ScriptedOutcome>>>,
    fallback: Option<ScriptedOutcome>,
    latency: Duration,
    fail_release: bool,
    stats: Arc<DriverStats>,
    connects: Arc<Mutex<Vec<RecordedConnect>>>,
}

impl ScriptedDriver {
    /// Creates a driver with an empty script that answers every query with one row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a driver that replays `outcomes` in order.
    pub fn with_script(outcomes: impl IntoIterator<Item = ScriptedOutcome>) -> Self {
        Self {
            script: Arc::new(Mutex::new(outcomes.into_iter().collect())),
            ..Self::default()
        }
    }

    /// Sets the outcome used once the script runs out.
    pub fn with_fallback(mut self, outcome: ScriptedOutcome) -> Self {
        self.fallback = Some(outcome);
        self
    }

    /// Delays every query by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Makes `close` and `dispose` report failures (after releasing).
    pub fn with_failing_release(mut self) -> Self {
        self.fail_release = true;
        self
    }

    /// Returns the shared lifecycle counters.
    pub fn stats(&self) -> Arc<DriverStats> {
        Arc::clone(&self.stats)
    }

    /// Returns every `create_engine` call seen so far.
    pub fn connects(&self) -> Vec<RecordedConnect> {
        lock(&self.connects).clone()
    }

    fn next_outcome(&self) -> ScriptedOutcome {
        lock(&self.script)
            .pop_front()
            .or_else(|| self.fallback.clone())
            .unwrap_or_else(|| ScriptedOutcome::rows(1))
    }
}

impl Driver for ScriptedDriver {
    fn create_engine(
        &self,
        connection_string: &str,
        attrs_before: ConnectAttributes,
    ) -> DriverResult<Box<dyn Engine>> {
        lock(&self.connects).push(RecordedConnect {
            connection_string: connection_string.to_string(),
            attrs_before,
        });
        self.stats.engines_created.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(ScriptedEngine {
            outcome: Some(self.next_outcome()),
            latency: self.latency,
            fail_release: self.fail_release,
            stats: Arc::clone(&self.stats),
        }))
    }
}

struct ScriptedEngine {
    outcome: Option<ScriptedOutcome>,
    latency: Duration,
    fail_release: bool,
    stats: Arc<DriverStats>,
}

#[async_trait]
impl Engine for ScriptedEngine {
    async fn connect(&mut self) -> DriverResult<Box<dyn Connection>> {
        let outcome = self
            .outcome
            .take()
            .ok_or_else(|| DriverError::interface("engine already used"))?;

        if let ScriptedOutcome::ConnectError(e) = outcome {
            return Err(e);
        }

        self.stats.connections_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedConnection {
            outcome: Some(outcome),
            latency: self.latency,
            fail_release: self.fail_release,
            stats: Arc::clone(&self.stats),
        }))
    }

    async fn dispose(&mut self) -> DriverResult<()> {
        self.stats.engines_disposed.fetch_add(1, Ordering::SeqCst);
        if self.fail_release {
            return Err(DriverError::interface("engine dispose failed"));
        }
        Ok(())
    }
}

struct ScriptedConnection {
    outcome: Option<ScriptedOutcome>,
    latency: Duration,
    fail_release: bool,
    stats: Arc<DriverStats>,
}

#[async_trait]
impl Connection for ScriptedConnection {
    async fn query(&mut self, _sql: &str) -> DriverResult<QueryResult> {
        self.stats.queries.fetch_add(1, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match self.outcome.take() {
            Some(ScriptedOutcome::Rows(result)) => Ok(result.with_execution_time(self.latency)),
            Some(ScriptedOutcome::QueryError(e)) | Some(ScriptedOutcome::ConnectError(e)) => {
                Err(e)
            }
            Some(ScriptedOutcome::Hang) => std::future::pending().await,
            None => Err(DriverError::interface("connection already used")),
        }
    }

    async fn close(&mut self) -> DriverResult<()> {
        self.stats.connections_closed.fetch_add(1, Ordering::SeqCst);
        if self.fail_release {
            return Err(DriverError::interface("connection close failed"));
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
