//! Integration test modules.

mod client_test;
mod config_test;
mod wire_test;
