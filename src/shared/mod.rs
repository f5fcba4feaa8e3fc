//! Shared Module
//!
//! Types that cross the storage and network boundaries: the queued action
//! model that is persisted on the device and replayed to the backend, the
//! configuration tunables, and the common error type.
//!
//! # Overview
//!
//! Nothing in here performs I/O. All types are designed for serialization
//! and can be used from any part of the client.

/// Queued and failed action records
pub mod action;

/// Shared error types
pub mod error;

/// Application configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use action::{ActionType, FailedAction, FailureReason, QueuedAction};
pub use config::{
    AppConfig, AppConfigBuilder, ConfigError, DrainPolicy, OverflowPolicy, RetrySettings,
};
pub use error::SharedError;
