//! # Action Queue
//!
//! Ordered, durable list of mutations waiting to be replayed against the
//! backend.
//!
//! ## Features
//!
//! - **Persistent Queue**: the full list is written to storage on every change
//! - **Bounded**: capacity with an explicit overflow policy
//! - **Snapshot Draining**: a sync pass takes ownership of the pending
//!   actions; anything queued meanwhile waits for the next pass
//! - **FIFO**: retained actions go back ahead of actions queued during a pass
//!
//! Storage failures are logged and swallowed. The in-memory list is the
//! source of truth while the process lives.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use siteforce_offline::client::local_db::MemoryStore;
//! use siteforce_offline::client::offline::queue::ActionQueue;
//! use siteforce_offline::shared::{ActionType, OverflowPolicy};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), siteforce_offline::client::error::OfflineError> {
//! let queue = ActionQueue::new(Arc::new(MemoryStore::new()), 100, OverflowPolicy::RejectNew);
//! queue.enqueue(ActionType::ClockIn, serde_json::json!({"lat": 1.35, "lng": 103.82})).await?;
//!
//! let batch = queue.take_snapshot().await;
//! // replay `batch`, then hand back whatever is still pending
//! queue.finish_pass(Vec::new()).await;
//! # Ok(())
//! # }
//! ```

use crate::client::error::{OfflineError, StorageError};
use crate::client::local_db::{keys, write_json, KeyValueStore};
use crate::shared::{ActionType, OverflowPolicy, QueuedAction};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Result of an enqueue
#[derive(Debug, Clone)]
pub struct Enqueued {
    /// The stored action
    pub action: QueuedAction,
    /// Oldest action pushed out under `OverflowPolicy::DropOldest`
    pub evicted: Option<QueuedAction>,
}

#[derive(Debug, Default)]
struct QueueState {
    /// Taken by the running sync pass, still persisted
    in_flight: Vec<QueuedAction>,
    /// Waiting for the next pass
    pending: VecDeque<QueuedAction>,
}

impl QueueState {
    fn len(&self) -> usize {
        self.in_flight.len() + self.pending.len()
    }

    fn ordered(&self) -> Vec<QueuedAction> {
        self.in_flight
            .iter()
            .chain(self.pending.iter())
            .cloned()
            .collect()
    }
}

/// Durable FIFO of queued actions
#[derive(Debug)]
pub struct ActionQueue {
    state: RwLock<QueueState>,
    store: Arc<dyn KeyValueStore>,
    /// Serializes writes so the last write always carries the latest list
    persist_lock: Mutex<()>,
    capacity: usize,
    overflow: OverflowPolicy,
}

impl ActionQueue {
    pub fn new(store: Arc<dyn KeyValueStore>, capacity: usize, overflow: OverflowPolicy) -> Self {
        Self {
            state: RwLock::new(QueueState::default()),
            store,
            persist_lock: Mutex::new(()),
            capacity,
            overflow,
        }
    }

    /// Replace the in-memory list with actions loaded from storage
    pub async fn rehydrate(&self, actions: Vec<QueuedAction>) {
        let mut state = self.state.write().await;
        state.in_flight.clear();
        state.pending = actions.into();
    }

    /// Queue a new action of `action_type`
    pub async fn enqueue(
        &self,
        action_type: ActionType,
        payload: serde_json::Value,
    ) -> Result<Enqueued, OfflineError> {
        let action = QueuedAction::new(action_type, payload);
        let evicted = self.push(action.clone()).await?;
        Ok(Enqueued { action, evicted })
    }

    /// Append an existing action, applying the overflow policy
    pub async fn push(&self, action: QueuedAction) -> Result<Option<QueuedAction>, OfflineError> {
        let evicted = {
            let mut state = self.state.write().await;
            let mut evicted = None;

            if state.len() >= self.capacity {
                match self.overflow {
                    OverflowPolicy::RejectNew => {
                        return Err(OfflineError::QueueFull {
                            capacity: self.capacity,
                        });
                    }
                    OverflowPolicy::DropOldest => match state.pending.pop_front() {
                        Some(oldest) => {
                            tracing::warn!("Queue full, evicting oldest action {}", oldest.id);
                            evicted = Some(oldest);
                        }
                        // everything is in flight, nothing may be evicted
                        None => {
                            return Err(OfflineError::QueueFull {
                                capacity: self.capacity,
                            });
                        }
                    },
                }
            }

            tracing::debug!("Queued {} ({})", action.id, action.action_type);
            state.pending.push_back(action);
            evicted
        };

        self.persist().await;
        Ok(evicted)
    }

    /// Take every pending action for a sync pass
    ///
    /// The taken actions stay persisted until `finish_pass` or `complete`.
    /// Actions still in flight from a pass that never finished are taken
    /// again, ahead of everything else.
    pub async fn take_snapshot(&self) -> Vec<QueuedAction> {
        let mut state = self.state.write().await;
        let orphaned = std::mem::take(&mut state.in_flight);
        if !orphaned.is_empty() {
            tracing::warn!(
                "Previous sync pass was interrupted, {} actions returned to the queue",
                orphaned.len()
            );
        }

        let taken: Vec<QueuedAction> = orphaned
            .into_iter()
            .chain(std::mem::take(&mut state.pending))
            .collect();
        state.in_flight = taken.clone();
        taken
    }

    /// Drop a replayed action from the in-flight set
    pub async fn complete(&self, action_id: &str) {
        {
            let mut state = self.state.write().await;
            state.in_flight.retain(|a| a.id != action_id);
        }
        self.persist().await;
    }

    /// End a sync pass: `retained` goes back in front of newer actions
    pub async fn finish_pass(&self, retained: Vec<QueuedAction>) {
        {
            let mut state = self.state.write().await;
            state.in_flight.clear();
            for action in retained.into_iter().rev() {
                state.pending.push_front(action);
            }
        }
        self.persist().await;
    }

    /// Make every queued action eligible immediately
    pub async fn clear_backoff(&self) -> usize {
        let cleared = {
            let mut state = self.state.write().await;
            let mut cleared = 0;
            let state = &mut *state;
            for action in state.in_flight.iter_mut().chain(state.pending.iter_mut()) {
                if action.next_attempt_at.take().is_some() {
                    cleared += 1;
                }
            }
            cleared
        };

        if cleared > 0 {
            self.persist().await;
        }
        cleared
    }

    /// All queued actions in replay order, in-flight ones first
    pub async fn snapshot(&self) -> Vec<QueuedAction> {
        self.state.read().await.ordered()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of actions a pass started now would replay
    pub async fn due_count(&self, now: chrono::DateTime<chrono::Utc>) -> usize {
        let state = self.state.read().await;
        state
            .in_flight
            .iter()
            .chain(state.pending.iter())
            .filter(|a| a.is_due(now))
            .count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Empty the queue and its persisted copy
    pub async fn clear(&self) -> Result<(), StorageError> {
        let _guard = self.persist_lock.lock().await;
        {
            let mut state = self.state.write().await;
            state.in_flight.clear();
            state.pending.clear();
        }
        self.store
            .multi_remove(&[keys::QUEUED_ACTIONS.to_string()])
            .await
    }

    /// Write the full list; failures are logged, memory is kept
    pub async fn persist(&self) {
        let _guard = self.persist_lock.lock().await;
        let actions = self.snapshot().await;

        if let Err(e) = write_json(self.store.as_ref(), keys::QUEUED_ACTIONS, &actions).await {
            tracing::warn!(
                "Failed to persist action queue ({} actions): {}",
                actions.len(),
                e
            );
        }
    }
}
