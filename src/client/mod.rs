//! Client Module
//!
//! Everything that runs on the device.
//!
//! # Architecture
//!
//! The client module is organized into focused submodules:
//!
//! - **`config`** - Configuration management (server URL, token storage)
//! - **`error`** - Storage, API and offline error types
//! - **`local_db`** - Durable key-value storage (SQLite or in-memory)
//! - **`api_client`** - Remote API contract and its reqwest implementation
//! - **`offline`** - Action queue, dead letters, cache and `OfflineManager`
//! - **`sync`** - Drain passes, network monitor, background task
//! - **`geofence`** - Site distance and GPS accuracy checks
//!
//! # Module Structure
//!
//! ```text
//! client/
//! ├── mod.rs        - Module exports and documentation
//! ├── config.rs     - Configuration management
//! ├── error.rs      - Error types
//! ├── api_client.rs - Remote API client
//! ├── geofence.rs   - Location checks
//! ├── local_db/     - Key-value storage
//! ├── offline/      - Offline manager and its parts
//! └── sync/         - Synchronization
//! ```

pub mod api_client;
pub mod config;
pub mod error;
pub mod geofence;
pub mod local_db;
pub mod offline;
pub mod sync;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use api_client::{HttpApiClient, RemoteApi};
pub use config::Config;
pub use error::{ApiError, OfflineError, StorageError};
pub use offline::{OfflineManager, OfflineSnapshot};
pub use sync::{BackgroundSync, NetworkMonitor, NetworkSignal, NetworkStatus, SyncReport, SyncState};
