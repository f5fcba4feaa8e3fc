//! Client Error Types
//!
//! Errors raised by the device-side components.
//!
//! # Error Types
//!
//! - `StorageError` - durable key-value storage failures
//! - `ApiError` - remote API failures, split into transient and permanent
//! - `OfflineError` - failures surfaced by the offline facade
//!
//! ## Transient vs permanent
//!
//! A permanent API error means replaying the same request can never
//! succeed (validation, auth, conflict). Those actions are dead-lettered
//! instead of retried. Everything else (network, timeout, 5xx, 408, 429) is
//! transient.

use crate::shared::{ConfigError, SharedError};
use thiserror::Error;

/// Durable storage failures
#[derive(Debug, Error)]
pub enum StorageError {
    /// SQLite error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Filesystem error while preparing the database location
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored value could not be (de)serialized
    #[error(transparent)]
    Shared(#[from] SharedError),

    /// Backend refused the operation
    #[error("Storage unavailable: {message}")]
    Unavailable {
        /// Human-readable error message
        message: String,
    },
}

impl StorageError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Shared(SharedError::from(err))
    }
}

/// Remote API failures
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApiError {
    /// Connection could not be established or was dropped
    #[error("Network error: {message}")]
    Network {
        /// Human-readable error message
        message: String,
    },

    /// No response within the request timeout
    #[error("Request timed out")]
    Timeout,

    /// Server answered with a non-success status
    #[error("Request failed with status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// Response body was not what we expected
    #[error("Failed to decode response: {message}")]
    Decode {
        /// Human-readable error message
        message: String,
    },

    /// Request could not be built from the action
    #[error(transparent)]
    Invalid(#[from] SharedError),
}

impl ApiError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    /// Whether replaying the same request can never succeed
    pub fn is_permanent(&self) -> bool {
        match self {
            ApiError::Status { status, .. } => {
                (400..500).contains(status) && *status != 408 && *status != 429
            }
            ApiError::Invalid(_) => true,
            ApiError::Network { .. } | ApiError::Timeout | ApiError::Decode { .. } => false,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_decode() {
            ApiError::Decode {
                message: err.to_string(),
            }
        } else {
            ApiError::network(err.to_string())
        }
    }
}

/// Errors returned by the offline facade
#[derive(Debug, Error)]
pub enum OfflineError {
    /// Queue is at capacity under the reject-new policy
    #[error("Action queue is full ({capacity} actions); sync required")]
    QueueFull {
        /// Configured capacity
        capacity: usize,
    },

    /// No dead-lettered action with that id
    #[error("No failed action with id {id}")]
    UnknownAction {
        /// Requested action id
        id: String,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
