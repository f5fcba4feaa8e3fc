//! Common test utilities and helpers
//!
//! This module provides shared utilities for all tests including:
//! - Storage fixtures (in-memory and SQLite on a temp dir)
//! - A recording `RemoteApi`
//! - Custom assertion macros

pub mod assertions;
pub mod mock_api;
pub mod storage;

// Re-export commonly used utilities
pub use mock_api::*;
pub use storage::*;
