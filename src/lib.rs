//! synapse-reader - token-authenticated, retrying query client for Azure Synapse.
//!
//! The access token is encoded into the ODBC driver's binary layout and
//! handed over as a pre-connect attribute. Reads are retried under a fixed
//! backoff; schema/syntax errors fail immediately.

pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod query;
pub mod wire;

pub use client::{TableName, WarehouseClient};
pub use error::{ReaderError, Result};
