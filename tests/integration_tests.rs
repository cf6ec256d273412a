//! Integration tests for synapse-reader.
//!
//! These run against the scripted driver; no warehouse is needed.
//!
//! Run with: `cargo test --test integration_tests`

mod integration;
