//! # Background Sync Task
//!
//! Keeps the offline manager in step with connectivity without any screen
//! having to ask.
//!
//! ## Features
//!
//! - **Startup Drain**: a queue persisted by an earlier session is replayed
//!   as soon as the task starts online
//! - **Flap Coalescing**: a connectivity change is applied only once it has
//!   held for the settle window
//! - **Retry Tick**: periodically retries actions whose backoff expired
//!
//! The task runs until the `BackgroundSync` handle is stopped or dropped.

use crate::client::offline::OfflineManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use super::NetworkStatus;

/// Handle to the background sync task
#[derive(Debug)]
pub struct BackgroundSync {
    handle: Option<JoinHandle<()>>,
}

impl BackgroundSync {
    /// Spawn the task for `manager`
    pub fn start(manager: Arc<OfflineManager>) -> Self {
        let handle = tokio::spawn(run(manager));
        Self {
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Abort the task; a pass in progress is cut short at its next await
    ///
    /// Actions the cut pass had not finished are replayed by the next one.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::info!("Background sync stopped");
        }
    }
}

impl Drop for BackgroundSync {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn run(manager: Arc<OfflineManager>) {
    let config = manager.config().clone();
    let settle = config.connectivity_settle();
    let mut status = manager.monitor().subscribe();
    let mut retry_tick = config.retry_tick().map(|period| {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        interval
    });

    tracing::info!(
        "Background sync started (settle {:?}, retry tick {:?})",
        settle,
        config.retry_tick()
    );

    // Apply whatever the monitor says now, then drain a persisted queue
    let online = status.borrow_and_update().is_online();
    if manager.on_connectivity_change(online).await.is_none() && online {
        manager.sync_queued_actions().await;
    }

    loop {
        tokio::select! {
            changed = status.changed() => {
                if changed.is_err() {
                    tracing::info!("Network monitor closed, background sync exiting");
                    break;
                }
                let online = settled_status(&mut status, settle).await.is_online();
                manager.on_connectivity_change(online).await;
            }
            _ = next_tick(&mut retry_tick) => {
                if manager.is_online().await {
                    tracing::debug!("Retry tick");
                    manager.sync_queued_actions().await;
                }
            }
        }
    }
}

/// The status once it has been left alone for `settle`
async fn settled_status(
    status: &mut watch::Receiver<NetworkStatus>,
    settle: Duration,
) -> NetworkStatus {
    let first = *status.borrow_and_update();
    if settle.is_zero() {
        return first;
    }

    tokio::time::sleep(settle).await;
    let settled = *status.borrow_and_update();
    if settled != first {
        tracing::debug!("Connectivity flapped to {:?} within {:?}", settled, settle);
    }
    settled
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
