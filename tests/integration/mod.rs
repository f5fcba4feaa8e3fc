//! Integration tests
//!
//! Exercise the public API end to end: the offline manager over real
//! SQLite storage, and the HTTP client against a mock server.

pub mod http_client_test;
pub mod persistence_test;
