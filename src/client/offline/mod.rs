//! # Offline Support
//!
//! Lets field staff keep working without connectivity: mutations are queued
//! on the device and replayed when the network returns, and screens read
//! last-known-good data from a local cache.
//!
//! ## Architecture
//!
//! The offline system consists of:
//! - **Action Queue**: durable FIFO of pending mutations
//! - **Failed Actions**: dead letters waiting for the user
//! - **Local Cache**: last fetched snapshot per domain and data freshness
//! - **Retry Logic**: per-action backoff and attempt limits
//!
//! `OfflineManager` ties them to the network monitor and the remote API. It
//! is the only type screens talk to.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use siteforce_offline::client::api_client::HttpApiClient;
//! use siteforce_offline::client::config::Config;
//! use siteforce_offline::client::local_db::LocalDatabase;
//! use siteforce_offline::client::offline::OfflineManager;
//! use siteforce_offline::client::sync::{NetworkMonitor, NetworkSignal};
//! use siteforce_offline::shared::{ActionType, AppConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::from_env()?;
//! let store = Arc::new(LocalDatabase::from_config(&config).await?);
//! let api = Arc::new(HttpApiClient::new(Config::from_app(config.clone())?)?);
//! let monitor = Arc::new(NetworkMonitor::default());
//!
//! let offline = OfflineManager::init(config, store, api, monitor.clone()).await?;
//! let _background = offline.start_background_sync();
//!
//! offline
//!     .queue_action(ActionType::ClockIn, serde_json::json!({"lat": 1.35, "lng": 103.82}))
//!     .await?;
//!
//! // platform callback
//! monitor.report(NetworkSignal::new(true, Some(true)));
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod failed;
pub mod queue;
pub mod retry;

pub use cache::{DataFreshness, LocalCache};
pub use failed::FailedActions;
pub use queue::{ActionQueue, Enqueued};
pub use retry::{BackoffStrategy, RetryDecision, RetryPolicy};

use crate::client::api_client::RemoteApi;
use crate::client::error::{OfflineError, StorageError};
use crate::client::local_db::{keys, KeyValueStore};
use crate::client::sync::{
    BackgroundSync, NetworkMonitor, SyncMetrics, SyncReport, SyncState, Synchronizer,
    SYNC_ERROR_MESSAGE,
};
use crate::shared::{ActionType, AppConfig, FailedAction, FailureReason, QueuedAction};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Everything a screen renders from
#[derive(Debug, Clone, PartialEq)]
pub struct OfflineSnapshot {
    pub sync: SyncState,
    pub cached: HashMap<String, Vec<Value>>,
    pub queued: Vec<QueuedAction>,
    pub failed: Vec<FailedAction>,
}

#[derive(Debug, Default)]
struct SyncFlags {
    is_online: bool,
    sync_error: Option<String>,
}

/// Clears the loading flag when a pass ends, including a cancelled one
struct LoadingGuard<'a>(&'a AtomicBool);

impl<'a> LoadingGuard<'a> {
    fn set(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Main offline manager coordinating all offline functionality
#[derive(Debug)]
pub struct OfflineManager {
    config: AppConfig,
    store: Arc<dyn KeyValueStore>,
    api: Arc<dyn RemoteApi>,
    monitor: Arc<NetworkMonitor>,
    queue: Arc<ActionQueue>,
    failed: Arc<FailedActions>,
    cache: LocalCache,
    synchronizer: Synchronizer,
    flags: RwLock<SyncFlags>,
    is_loading: AtomicBool,
    /// Held for the duration of a sync pass
    sync_lock: Mutex<()>,
    metrics: RwLock<SyncMetrics>,
}

impl OfflineManager {
    /// Build the manager and load everything persisted by earlier sessions
    pub async fn init(
        config: AppConfig,
        store: Arc<dyn KeyValueStore>,
        api: Arc<dyn RemoteApi>,
        monitor: Arc<NetworkMonitor>,
    ) -> Result<Arc<Self>, OfflineError> {
        config.validate()?;

        let queue = Arc::new(ActionQueue::new(
            store.clone(),
            config.queue_capacity,
            config.overflow_policy,
        ));
        let failed = Arc::new(FailedActions::new(store.clone()));
        let cache = LocalCache::new(store.clone(), config.stale_threshold());
        let synchronizer = Synchronizer::new(
            queue.clone(),
            failed.clone(),
            api.clone(),
            RetryPolicy::from_settings(&config.retry),
            config.drain_policy,
        );

        let manager = Self {
            flags: RwLock::new(SyncFlags {
                is_online: monitor.is_online(),
                ..SyncFlags::default()
            }),
            config,
            store,
            api,
            monitor,
            queue,
            failed,
            cache,
            synchronizer,
            is_loading: AtomicBool::new(false),
            sync_lock: Mutex::new(()),
            metrics: RwLock::new(SyncMetrics::new()),
        };
        manager.rehydrate().await?;

        Ok(Arc::new(manager))
    }

    /// One multi-get for everything persisted; unreadable values are skipped
    async fn rehydrate(&self) -> Result<(), StorageError> {
        let mut wanted = vec![
            keys::QUEUED_ACTIONS.to_string(),
            keys::FAILED_ACTIONS.to_string(),
            keys::LAST_SYNC_TIME.to_string(),
        ];
        wanted.extend(self.config.cached_domains.iter().map(|d| keys::cached(d)));

        let mut values: HashMap<String, String> = self
            .store
            .multi_get(&wanted)
            .await?
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key, v)))
            .collect();

        if let Some(actions) = decode::<Vec<QueuedAction>>(&mut values, keys::QUEUED_ACTIONS) {
            tracing::info!("Restored {} queued actions", actions.len());
            self.queue.rehydrate(actions).await;
        }
        if let Some(entries) = decode::<Vec<FailedAction>>(&mut values, keys::FAILED_ACTIONS) {
            self.failed.rehydrate(entries).await;
        }
        if let Some(at) = decode::<DateTime<Utc>>(&mut values, keys::LAST_SYNC_TIME) {
            self.cache.rehydrate_last_sync(Some(at)).await;
        }
        for domain in &self.config.cached_domains {
            if let Some(records) = decode::<Vec<Value>>(&mut values, &keys::cached(domain)) {
                self.cache.rehydrate_domain(domain, records).await;
            }
        }

        Ok(())
    }

    pub async fn is_online(&self) -> bool {
        self.flags.read().await.is_online
    }

    pub async fn is_offline(&self) -> bool {
        !self.is_online().await
    }

    pub async fn sync_state(&self) -> SyncState {
        let flags = self.flags.read().await;
        SyncState {
            is_online: flags.is_online,
            last_sync_time: self.cache.last_sync_time().await,
            sync_error: flags.sync_error.clone(),
            is_loading: self.is_loading.load(Ordering::SeqCst),
        }
    }

    pub async fn state(&self) -> OfflineSnapshot {
        OfflineSnapshot {
            sync: self.sync_state().await,
            cached: self.cache.all().await,
            queued: self.queue.snapshot().await,
            failed: self.failed.list().await,
        }
    }

    /// Queue a mutation for replay
    pub async fn queue_action(
        &self,
        action_type: ActionType,
        payload: Value,
    ) -> Result<QueuedAction, OfflineError> {
        let Enqueued { action, evicted } = self.queue.enqueue(action_type, payload).await?;

        if let Some(evicted) = evicted {
            self.failed
                .extend([FailedAction::new(evicted, FailureReason::Evicted)])
                .await;
        }

        tracing::info!("Queued {} for sync", action.action_type);
        Ok(action)
    }

    /// Run one drain pass
    ///
    /// Returns `None` without touching any state when offline, when a pass
    /// is already running, or when the queue is empty.
    pub async fn sync_queued_actions(&self) -> Option<SyncReport> {
        if !self.is_online().await {
            tracing::debug!("Offline, sync skipped");
            return None;
        }
        let Ok(_pass) = self.sync_lock.try_lock() else {
            tracing::debug!("Sync already in progress");
            return None;
        };
        if self.queue.is_empty().await {
            return None;
        }

        let loading = LoadingGuard::set(&self.is_loading);
        self.metrics.write().await.record_pass_start();

        let report = self.synchronizer.run_pass(Utc::now()).await;

        if report.is_successful() {
            self.cache.record_sync(Utc::now()).await;
        }
        {
            let mut flags = self.flags.write().await;
            if !report.is_clean() {
                flags.sync_error = Some(SYNC_ERROR_MESSAGE.to_string());
            } else if report.is_successful() {
                flags.sync_error = None;
            }
        }
        self.metrics.write().await.record_pass_end(&report);
        drop(loading);

        tracing::info!(
            "Sync pass done: {} succeeded, {} failed, {} dead-lettered, {} deferred",
            report.succeeded,
            report.failed,
            report.dead_lettered.len(),
            report.deferred
        );
        Some(report)
    }

    /// User-initiated sync: waiting backoff delays are skipped
    pub async fn sync_now(&self) -> Option<SyncReport> {
        if self.is_offline().await {
            return None;
        }
        self.queue.clear_backoff().await;
        self.sync_queued_actions().await
    }

    /// Apply a confirmed connectivity change
    ///
    /// Going from offline to online clears backoff delays and runs exactly
    /// one sync pass.
    pub async fn on_connectivity_change(&self, online: bool) -> Option<SyncReport> {
        let was_online = {
            let mut flags = self.flags.write().await;
            std::mem::replace(&mut flags.is_online, online)
        };

        match (was_online, online) {
            (false, true) => {
                tracing::info!("Back online, syncing queued actions");
                let cleared = self.queue.clear_backoff().await;
                if cleared > 0 {
                    tracing::debug!("Cleared backoff on {} actions", cleared);
                }
                self.sync_queued_actions().await
            }
            (true, false) => {
                tracing::info!("Went offline, {} actions queued", self.queue.len().await);
                None
            }
            _ => None,
        }
    }

    pub async fn cache_data(&self, domain: &str, records: Vec<Value>) {
        self.cache.cache_data(domain, records).await;
    }

    pub async fn get_cached_data(&self, domain: &str) -> Vec<Value> {
        self.cache.get_cached_data(domain).await
    }

    /// Fetch `domain` when online and cache it; otherwise serve the cache
    pub async fn refresh_domain(&self, domain: &str) -> Vec<Value> {
        if self.is_offline().await {
            return self.get_cached_data(domain).await;
        }

        match self.api.fetch_collection(domain).await {
            Ok(records) => {
                self.cache.cache_data(domain, records.clone()).await;
                records
            }
            Err(e) => {
                tracing::warn!("Failed to refresh {}, serving cache: {}", domain, e);
                self.get_cached_data(domain).await
            }
        }
    }

    pub async fn get_data_freshness(&self) -> DataFreshness {
        self.cache.freshness(Utc::now()).await
    }

    pub async fn clear_sync_error(&self) {
        self.flags.write().await.sync_error = None;
    }

    pub async fn queued_actions(&self) -> Vec<QueuedAction> {
        self.queue.snapshot().await
    }

    pub async fn failed_actions(&self) -> Vec<FailedAction> {
        self.failed.list().await
    }

    /// Move a failed action back to the end of the queue with a fresh attempt count
    pub async fn retry_failed(&self, action_id: &str) -> Result<QueuedAction, OfflineError> {
        let entry = self
            .failed
            .take(action_id)
            .await
            .ok_or_else(|| OfflineError::UnknownAction {
                id: action_id.to_string(),
            })?;

        let mut action = entry.action.clone();
        action.reset_attempts();

        match self.queue.push(action.clone()).await {
            Ok(evicted) => {
                if let Some(evicted) = evicted {
                    self.failed
                        .extend([FailedAction::new(evicted, FailureReason::Evicted)])
                        .await;
                }
                tracing::info!("Re-queued failed action {}", action.id);
                Ok(action)
            }
            Err(e) => {
                self.failed.restore(entry).await;
                Err(e)
            }
        }
    }

    pub async fn discard_failed(&self, action_id: &str) -> Result<FailedAction, OfflineError> {
        let entry = self
            .failed
            .take(action_id)
            .await
            .ok_or_else(|| OfflineError::UnknownAction {
                id: action_id.to_string(),
            })?;
        tracing::info!("Discarded failed action {}", action_id);
        Ok(entry)
    }

    /// Logout: forget queue, dead letters, cache and last sync time
    pub async fn clear_all(&self) -> Result<(), OfflineError> {
        let _pass = self.sync_lock.lock().await;

        self.queue.clear().await?;
        self.failed.clear().await?;
        self.cache.clear().await?;
        self.flags.write().await.sync_error = None;

        tracing::info!("Cleared all offline data");
        Ok(())
    }

    pub async fn metrics(&self) -> SyncMetrics {
        self.metrics.read().await.clone()
    }

    pub fn monitor(&self) -> &Arc<NetworkMonitor> {
        &self.monitor
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Spawn the loop reacting to connectivity changes
    pub fn start_background_sync(self: &Arc<Self>) -> BackgroundSync {
        BackgroundSync::start(self.clone())
    }
}

fn decode<T: DeserializeOwned>(values: &mut HashMap<String, String>, key: &str) -> Option<T> {
    let raw = values.remove(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Ignoring unreadable stored value for {}: {}", key, e);
            None
        }
    }
}
