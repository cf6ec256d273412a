//! Observability hooks for the retry loop.
//!
//! Observers are notified of attempt outcomes and the final duration. They
//! return nothing, so an observer can never change what a read does.

use std::time::Duration;

use tracing::{info, warn};

use crate::error::ReaderError;

/// Receives progress notifications from a read.
pub trait ReadObserver: Send + Sync {
    /// A connectivity failure consumed one attempt.
    fn attempt_failed(&self, _attempt: u32, _max_attempts: u32, _error: &ReaderError) {}

    /// A zero-row result consumed one attempt and will be retried after `retry_in`.
    fn empty_result(&self, _attempt: u32, _max_attempts: u32, _retry_in: Duration) {}

    /// The read returned `rows` rows after `attempts` attempts.
    fn completed(&self, _attempts: u32, _rows: usize, _elapsed: Duration) {}

    /// The read gave up.
    fn exhausted(&self, _attempts: u32, _elapsed: Duration) {}
}

/// Logs read progress through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ReadObserver for TracingObserver {
    fn attempt_failed(&self, attempt: u32, max_attempts: u32, error: &ReaderError) {
        warn!("Connection attempt {attempt}/{max_attempts} failed: {error}");
    }

    fn empty_result(&self, attempt: u32, max_attempts: u32, retry_in: Duration) {
        info!("0 rows returned (attempt {attempt}/{max_attempts}), retrying in {retry_in:?}");
    }

    fn completed(&self, attempts: u32, rows: usize, elapsed: Duration) {
        info!("Query time: {elapsed:?} ({rows} rows, {attempts} attempt(s))");
    }

    fn exhausted(&self, attempts: u32, elapsed: Duration) {
        warn!("Giving up after {attempts} attempts ({elapsed:?})");
    }
}

/// Ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ReadObserver for NoopObserver {}
