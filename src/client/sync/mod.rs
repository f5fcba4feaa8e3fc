//! # Sync
//!
//! Replays queued actions against the backend once connectivity returns.
//!
//! ## Architecture
//!
//! - **Synchronizer**: one drain pass over a snapshot of the queue
//! - **Network Monitor**: connectivity detection
//! - **Background**: reacts to connectivity changes and retries on a tick
//! - **Sync State**: what the UI reads
//! - **Metrics**: pass counters and timings
//!
//! ## Drain pass
//!
//! Actions are replayed one at a time in queue order. Each action is handled
//! on its own:
//!
//! - success: removed from the queue
//! - permanent error (validation, auth, conflict): moved to the failed list
//! - transient error: kept with a backoff delay, or moved to the failed list
//!   once its attempts run out
//!
//! With `DrainPolicy::StopOnFirstFailure` the pass stops at the first
//! failure and leaves the rest of the snapshot untouched. The failing action
//! stays queued with a backoff delay, even on a permanent error, until its
//! attempts run out.

pub mod background;
pub mod metrics;
pub mod network_monitor;
pub mod sync_state;

pub use background::BackgroundSync;
pub use metrics::SyncMetrics;
pub use network_monitor::{NetworkMonitor, NetworkSignal, NetworkStatus};
pub use sync_state::{SyncState, SYNC_ERROR_MESSAGE};

use crate::client::api_client::RemoteApi;
use crate::client::offline::failed::FailedActions;
use crate::client::offline::queue::ActionQueue;
use crate::client::offline::retry::{RetryDecision, RetryPolicy};
use crate::shared::{DrainPolicy, FailedAction, FailureReason};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Outcome of one drain pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    /// Actions sent to the backend
    pub attempted: usize,
    pub succeeded: usize,
    /// Transient failures kept for a later pass
    pub failed: usize,
    /// Not attempted: still backing off, or skipped after a stop
    pub deferred: usize,
    pub dead_lettered: Vec<FailedAction>,
}

impl SyncReport {
    /// No action failed or was given up on
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.dead_lettered.is_empty()
    }

    /// Something was replayed and every attempt succeeded
    pub fn is_successful(&self) -> bool {
        self.attempted > 0 && self.is_clean()
    }
}

/// Runs drain passes over the action queue
#[derive(Debug)]
pub struct Synchronizer {
    queue: Arc<ActionQueue>,
    failed: Arc<FailedActions>,
    api: Arc<dyn RemoteApi>,
    retry: RetryPolicy,
    drain_policy: DrainPolicy,
}

impl Synchronizer {
    pub fn new(
        queue: Arc<ActionQueue>,
        failed: Arc<FailedActions>,
        api: Arc<dyn RemoteApi>,
        retry: RetryPolicy,
        drain_policy: DrainPolicy,
    ) -> Self {
        Self {
            queue,
            failed,
            api,
            retry,
            drain_policy,
        }
    }

    /// Replay every pending action that is due at `now`
    ///
    /// Callers make sure only one pass runs at a time. A pass dropped at any
    /// await leaves its unfinished actions in the queue for the next one.
    pub async fn run_pass(&self, now: DateTime<Utc>) -> SyncReport {
        let batch = self.queue.take_snapshot().await;
        let mut report = SyncReport::default();
        let mut retained = Vec::new();
        let mut halted = false;
        let stop_on_failure = self.drain_policy == DrainPolicy::StopOnFirstFailure;

        tracing::debug!("Sync pass over {} actions", batch.len());

        for mut action in batch {
            if halted || !action.is_due(now) {
                report.deferred += 1;
                retained.push(action);
                continue;
            }

            report.attempted += 1;
            let error = match self.api.dispatch(&action).await {
                Ok(()) => {
                    tracing::debug!("Replayed {} ({})", action.id, action.action_type);
                    report.succeeded += 1;
                    self.queue.complete(&action.id).await;
                    continue;
                }
                Err(error) => error,
            };

            let message = error.to_string();
            let permanent = error.is_permanent();

            // A stopping pass keeps the failing action queued, rejected or not
            if permanent && !stop_on_failure {
                tracing::warn!("Action {} rejected: {}", action.id, error);
                action.attempts += 1;
                action.last_error = Some(message.clone());
                self.dead_letter(
                    FailedAction::new(action, FailureReason::Rejected { message }),
                    &mut report,
                )
                .await;
                continue;
            }

            match self.retry.record_failure(&mut action, &message, now) {
                RetryDecision::RetryAt(at) => {
                    tracing::warn!(
                        "Action {} failed (attempt {}), retrying after {}: {}",
                        action.id,
                        action.attempts,
                        at,
                        error
                    );
                    report.failed += 1;
                    retained.push(action);
                }
                RetryDecision::GiveUp => {
                    let reason = if permanent {
                        FailureReason::Rejected { message }
                    } else {
                        FailureReason::RetriesExhausted {
                            attempts: action.attempts,
                        }
                    };
                    self.dead_letter(FailedAction::new(action, reason), &mut report)
                        .await;
                }
            }
            halted = stop_on_failure;
        }

        self.queue.finish_pass(retained).await;

        report
    }

    /// Move `entry` to the failed list, then out of the queue
    async fn dead_letter(&self, entry: FailedAction, report: &mut SyncReport) {
        self.failed.extend([entry.clone()]).await;
        self.queue.complete(&entry.action.id).await;
        report.dead_lettered.push(entry);
    }
}
