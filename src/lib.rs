//! SiteForce Offline - Main Library
//!
//! Offline support for the SiteForce construction workforce mobile client.
//! Field staff clock in, start and complete tasks and report progress from
//! sites with unreliable connectivity; this crate keeps those actions on the
//! device and replays them once the network is back.
//!
//! # Overview
//!
//! This library provides:
//! - A durable, bounded FIFO queue of pending mutations
//! - Connectivity-gated sync with per-action retry, backoff and dead letters
//! - A local cache of last-known-good collections with a freshness signal
//! - A reqwest client for the backend with idempotency keys
//! - Geofence checks for clock-in
//!
//! # Module Structure
//!
//! - **`shared`** - Types that are persisted or sent over the wire
//!   - Queued and failed actions
//!   - Configuration
//!   - Error types
//!
//! - **`client`** - Device-side components
//!   - `OfflineManager`, the single entry point for screens
//!   - SQLite key-value storage
//!   - Sync passes and the background task
//!
//! - **`telemetry`** - tracing subscriber setup
//!
//! # Usage
//!
//! ```rust,no_run
//! use siteforce_offline::client::local_db::MemoryStore;
//! use siteforce_offline::client::{HttpApiClient, NetworkMonitor, OfflineManager};
//! use siteforce_offline::client::config::Config;
//! use siteforce_offline::shared::{ActionType, AppConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! siteforce_offline::telemetry::init_tracing();
//!
//! let config = AppConfig::default();
//! let api = Arc::new(HttpApiClient::new(Config::from_app(config.clone())?)?);
//! let offline = OfflineManager::init(
//!     config,
//!     Arc::new(MemoryStore::new()),
//!     api,
//!     Arc::new(NetworkMonitor::default()),
//! )
//! .await?;
//!
//! offline
//!     .queue_action(ActionType::StartTask, serde_json::json!({"taskId": 42}))
//!     .await?;
//! let freshness = offline.get_data_freshness().await;
//! println!("{}", freshness.stale_duration);
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! All components are `Send + Sync` and shared as `Arc`. State lives behind
//! `tokio::sync` locks and at most one sync pass runs at a time.
//!
//! # Error Handling
//!
//! - `Result<T, E>` for fallible operations
//! - Custom error types in `shared::error` and `client::error`
//! - Storage write failures are logged, never surfaced to the caller

/// Shared types and data structures
pub mod shared;

/// Device-side offline support
pub mod client;

/// Logging setup
pub mod telemetry;
