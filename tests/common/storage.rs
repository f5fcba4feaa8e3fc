//! Storage fixtures
//!
//! Each SQLite fixture lives in its own temp dir so tests can run in
//! parallel. Keep the `TempDir` alive for as long as the database is used.

use siteforce_offline::client::local_db::LocalDatabase;
use siteforce_offline::client::{NetworkMonitor, NetworkStatus, OfflineManager, RemoteApi};
use siteforce_offline::shared::AppConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// A database file path inside a fresh temp dir
pub fn temp_db_path() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("offline.db");
    (dir, path)
}

pub async fn open_db(path: &PathBuf) -> Arc<LocalDatabase> {
    Arc::new(
        LocalDatabase::open(path)
            .await
            .expect("Failed to open test database"),
    )
}

/// Config with the timing knobs turned down for tests
pub fn test_config() -> AppConfig {
    AppConfig::builder()
        .connectivity_settle_ms(0)
        .retry_tick_secs(0)
        .build()
        .expect("Invalid test config")
}

pub fn monitor(online: bool) -> Arc<NetworkMonitor> {
    Arc::new(NetworkMonitor::new(if online {
        NetworkStatus::Online
    } else {
        NetworkStatus::Offline
    }))
}

pub async fn manager_on(
    store: Arc<LocalDatabase>,
    api: Arc<dyn RemoteApi>,
    monitor: Arc<NetworkMonitor>,
    config: AppConfig,
) -> Arc<OfflineManager> {
    OfflineManager::init(config, store, api, monitor)
        .await
        .expect("Failed to init offline manager")
}
