//! Bounded, fixed-backoff retry around [`QueryExecutor`].

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::executor::{AttemptError, QueryExecutor};
use super::observer::ReadObserver;
use crate::auth::TokenProvider;
use crate::db::QueryResult;
use crate::error::{ReaderError, Result};
use crate::wire::encode_token;

/// Default number of attempts per read.
const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default delay between attempts.
const DEFAULT_SLEEP: Duration = Duration::from_secs(10);

/// How a read retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    sleep: Duration,
    retry_on_zero: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            sleep: DEFAULT_SLEEP,
            retry_on_zero: false,
        }
    }
}

impl RetryPolicy {
    /// Creates the default policy: 5 attempts, 10s apart, zero rows accepted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the attempt budget shared by connectivity failures and empty results.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Sets the fixed delay between attempts.
    pub fn with_sleep(mut self, sleep: Duration) -> Self {
        self.sleep = sleep;
        self
    }

    /// Retries zero-row results, for tables that are still being loaded.
    pub fn with_retry_on_zero(mut self, retry_on_zero: bool) -> Self {
        self.retry_on_zero = retry_on_zero;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn sleep(&self) -> Duration {
        self.sleep
    }

    pub fn retry_on_zero(&self) -> bool {
        self.retry_on_zero
    }
}

/// Drives query attempts until one succeeds, one fails fatally, or the budget runs out.
pub struct RetryController<'a> {
    executor: QueryExecutor<'a>,
    tokens: &'a dyn TokenProvider,
    observer: &'a dyn ReadObserver,
}

impl<'a> RetryController<'a> {
    /// Creates a new controller.
    pub fn new(
        executor: QueryExecutor<'a>,
        tokens: &'a dyn TokenProvider,
        observer: &'a dyn ReadObserver,
    ) -> Self {
        Self {
            executor,
            tokens,
            observer,
        }
    }

    /// Runs `sql` under `policy`.
    ///
    /// A fresh token is fetched and encoded for every attempt. Schema/syntax
    /// errors and authentication failures end the read immediately;
    /// connectivity errors and (with `retry_on_zero`) empty results consume
    /// one attempt each and are followed by the fixed sleep.
    pub async fn read(
        &self,
        sql: &str,
        policy: &RetryPolicy,
        cancel: &CancellationToken,
    ) -> Result<QueryResult> {
        let max_attempts = policy.max_attempts();
        let start = Instant::now();
        let mut attempt = 0;

        while attempt < max_attempts {
            let token = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ReaderError::Cancelled),
                token = self.tokens.get_token() => token?,
            };
            let encoded = encode_token(token.secret())?;

            debug!("Attempt {}/{} on {}", attempt + 1, max_attempts, self.host());

            match self.executor.execute_once(sql, &encoded, cancel).await {
                Ok(result) if result.is_empty() && policy.retry_on_zero() => {
                    attempt += 1;
                    self.observer
                        .empty_result(attempt, max_attempts, policy.sleep());
                }
                Ok(result) => {
                    self.observer
                        .completed(attempt + 1, result.row_count, start.elapsed());
                    return Ok(result);
                }
                Err(AttemptError::Cancelled) => return Err(ReaderError::Cancelled),
                Err(AttemptError::Driver(e)) if e.is_fatal() => {
                    return Err(ReaderError::fatal_query(e.message));
                }
                Err(AttemptError::Driver(e)) => {
                    attempt += 1;
                    let error = ReaderError::transient(e.to_string());
                    self.observer.attempt_failed(attempt, max_attempts, &error);
                }
            }

            if attempt < max_attempts {
                backoff(policy.sleep(), cancel).await?;
            }
        }

        self.observer.exhausted(attempt, start.elapsed());
        Err(ReaderError::retry_exhausted(self.host(), attempt))
    }

    fn host(&self) -> &str {
        &self.executor.config().server
    }
}

/// Sleeps for `delay` unless cancelled first.
async fn backoff(delay: Duration, cancel: &CancellationToken) -> Result<()> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ReaderError::Cancelled),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}
