//! Query execution with bounded retries.
//!
//! [`QueryExecutor`] runs exactly one attempt and always releases the
//! connection it opened. [`RetryController`] drives attempts under a fixed
//! backoff, re-resolving the access token each time.

pub mod executor;
pub mod observer;
pub mod retry;

pub use executor::{AttemptError, ConnectionHandle, QueryExecutor};
pub use observer::{NoopObserver, ReadObserver, TracingObserver};
pub use retry::{RetryController, RetryPolicy};
