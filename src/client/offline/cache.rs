//! # Local Cache Store
//!
//! Last-known-good copies of domain collections (`tasks`, `attendance`, …)
//! plus the time of the last successful sync. Snapshots are replaced
//! wholesale; there is no per-record invalidation. Freshness is one global
//! signal derived from the last sync.

use crate::client::error::StorageError;
use crate::client::local_db::{keys, write_json, KeyValueStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Staleness of cached data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataFreshness {
    pub is_stale: bool,
    /// "Never synced", "Just now", "5 minutes ago", …
    pub stale_duration: String,
    pub last_sync_time: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct LocalCache {
    data: RwLock<HashMap<String, Vec<Value>>>,
    last_sync_time: RwLock<Option<DateTime<Utc>>>,
    store: Arc<dyn KeyValueStore>,
    stale_threshold: chrono::Duration,
}

impl LocalCache {
    pub fn new(store: Arc<dyn KeyValueStore>, stale_threshold: chrono::Duration) -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            last_sync_time: RwLock::new(None),
            store,
            stale_threshold,
        }
    }

    /// Load a snapshot read from storage without writing it back
    pub async fn rehydrate_domain(&self, domain: &str, records: Vec<Value>) {
        self.data.write().await.insert(domain.to_string(), records);
    }

    pub async fn rehydrate_last_sync(&self, at: Option<DateTime<Utc>>) {
        *self.last_sync_time.write().await = at;
    }

    /// Replace the snapshot for `domain` and persist it
    pub async fn cache_data(&self, domain: &str, records: Vec<Value>) {
        let key = keys::cached(domain);
        if let Err(e) = write_json(self.store.as_ref(), &key, &records).await {
            tracing::warn!("Failed to persist cache for {}: {}", domain, e);
        }
        tracing::debug!("Cached {} {} records", records.len(), domain);
        self.data.write().await.insert(domain.to_string(), records);
    }

    /// Last snapshot for `domain`, empty if never cached
    pub async fn get_cached_data(&self, domain: &str) -> Vec<Value> {
        self.data
            .read()
            .await
            .get(domain)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn all(&self) -> HashMap<String, Vec<Value>> {
        self.data.read().await.clone()
    }

    pub async fn last_sync_time(&self) -> Option<DateTime<Utc>> {
        *self.last_sync_time.read().await
    }

    /// Record a successful drain at `at`
    pub async fn record_sync(&self, at: DateTime<Utc>) {
        *self.last_sync_time.write().await = Some(at);
        if let Err(e) = write_json(self.store.as_ref(), keys::LAST_SYNC_TIME, &at).await {
            tracing::warn!("Failed to persist last sync time: {}", e);
        }
    }

    pub async fn freshness(&self, now: DateTime<Utc>) -> DataFreshness {
        let last_sync_time = self.last_sync_time().await;

        match last_sync_time {
            None => DataFreshness {
                is_stale: true,
                stale_duration: "Never synced".to_string(),
                last_sync_time: None,
            },
            Some(at) => {
                let age = now - at;
                DataFreshness {
                    is_stale: age > self.stale_threshold,
                    stale_duration: describe_age(age),
                    last_sync_time,
                }
            }
        }
    }

    /// Forget every cached domain and the last sync time
    pub async fn clear(&self) -> Result<(), StorageError> {
        let mut removed: Vec<String> = {
            let mut data = self.data.write().await;
            data.drain().map(|(domain, _)| keys::cached(&domain)).collect()
        };
        removed.push(keys::LAST_SYNC_TIME.to_string());
        *self.last_sync_time.write().await = None;

        self.store.multi_remove(&removed).await
    }
}

/// Human-readable age, e.g. "5 minutes ago"
pub fn describe_age(age: chrono::Duration) -> String {
    let minutes = age.num_minutes();
    if minutes < 1 {
        return "Just now".to_string();
    }

    let (count, unit) = if minutes < 60 {
        (minutes, "minute")
    } else if minutes < 60 * 24 {
        (age.num_hours(), "hour")
    } else {
        (age.num_days(), "day")
    };

    if count == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", count, unit)
    }
}
