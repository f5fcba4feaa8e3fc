//! # Failed Actions
//!
//! Dead-letter list for actions the sync pass gave up on: rejected by the
//! server, out of retries, or evicted from a full queue. Entries stay here
//! until the user retries or discards them.

use crate::client::error::StorageError;
use crate::client::local_db::{keys, write_json, KeyValueStore};
use crate::shared::FailedAction;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

#[derive(Debug)]
pub struct FailedActions {
    entries: RwLock<Vec<FailedAction>>,
    store: Arc<dyn KeyValueStore>,
    persist_lock: Mutex<()>,
}

impl FailedActions {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            store,
            persist_lock: Mutex::new(()),
        }
    }

    pub async fn rehydrate(&self, entries: Vec<FailedAction>) {
        *self.entries.write().await = entries;
    }

    pub async fn extend(&self, failed: impl IntoIterator<Item = FailedAction>) {
        {
            let mut entries = self.entries.write().await;
            for entry in failed {
                tracing::warn!("Dead-lettered {}: {}", entry.action.id, entry.reason);
                entries.push(entry);
            }
        }
        self.persist().await;
    }

    /// Remove and return the entry for `action_id`
    pub async fn take(&self, action_id: &str) -> Option<FailedAction> {
        let taken = {
            let mut entries = self.entries.write().await;
            let index = entries.iter().position(|e| e.action.id == action_id)?;
            entries.remove(index)
        };
        self.persist().await;
        Some(taken)
    }

    /// Put an entry back at its original position (e.g. a retry that could not be queued)
    pub async fn restore(&self, entry: FailedAction) {
        {
            let mut entries = self.entries.write().await;
            let index = entries
                .iter()
                .position(|e| e.failed_at > entry.failed_at)
                .unwrap_or(entries.len());
            entries.insert(index, entry);
        }
        self.persist().await;
    }

    pub async fn list(&self) -> Vec<FailedAction> {
        self.entries.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn clear(&self) -> Result<(), StorageError> {
        let _guard = self.persist_lock.lock().await;
        self.entries.write().await.clear();
        self.store
            .multi_remove(&[keys::FAILED_ACTIONS.to_string()])
            .await
    }

    async fn persist(&self) {
        let _guard = self.persist_lock.lock().await;
        let entries = self.list().await;
        if let Err(e) = write_json(self.store.as_ref(), keys::FAILED_ACTIONS, &entries).await {
            tracing::warn!("Failed to persist {} failed actions: {}", entries.len(), e);
        }
    }
}
