//! # Network Monitor
//!
//! Turns platform reachability signals into a single online/offline status
//! and broadcasts changes.
//!
//! ## Features
//!
//! - **Connectivity Detection**: online only when connected *and* the
//!   internet is reachable; a captive portal reports `Limited`
//! - **Change Filtering**: repeated identical signals are not re-broadcast
//! - **Subscriptions**: `tokio::sync::watch` receivers always see the latest status

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Raw reachability signal as delivered by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSignal {
    pub is_connected: bool,
    /// `None` while the platform has not determined reachability yet
    pub is_internet_reachable: Option<bool>,
}

impl NetworkSignal {
    pub fn new(is_connected: bool, is_internet_reachable: Option<bool>) -> Self {
        Self {
            is_connected,
            is_internet_reachable,
        }
    }
}

/// Network connectivity status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkStatus {
    /// Connected and the internet is reachable
    Online,
    /// Connected to a network without (known) internet access
    Limited,
    /// No network
    Offline,
}

impl NetworkStatus {
    pub fn is_online(&self) -> bool {
        matches!(self, NetworkStatus::Online)
    }
}

impl From<NetworkSignal> for NetworkStatus {
    fn from(signal: NetworkSignal) -> Self {
        match (signal.is_connected, signal.is_internet_reachable) {
            (true, Some(true)) => NetworkStatus::Online,
            (true, _) => NetworkStatus::Limited,
            (false, _) => NetworkStatus::Offline,
        }
    }
}

#[derive(Debug)]
pub struct NetworkMonitor {
    status: watch::Sender<NetworkStatus>,
}

impl NetworkMonitor {
    pub fn new(initial: NetworkStatus) -> Self {
        let (status, _) = watch::channel(initial);
        Self { status }
    }

    /// Feed a platform signal; returns whether the status changed
    pub fn report(&self, signal: NetworkSignal) -> bool {
        self.set_status(NetworkStatus::from(signal))
    }

    pub fn set_status(&self, next: NetworkStatus) -> bool {
        let changed = self.status.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });

        if changed {
            match next {
                NetworkStatus::Online => tracing::info!("Network: ONLINE"),
                NetworkStatus::Limited => {
                    tracing::warn!("Network: connected, internet unreachable")
                }
                NetworkStatus::Offline => tracing::warn!("Network: OFFLINE"),
            }
        }
        changed
    }

    pub fn status(&self) -> NetworkStatus {
        *self.status.borrow()
    }

    pub fn is_online(&self) -> bool {
        self.status().is_online()
    }

    pub fn subscribe(&self) -> watch::Receiver<NetworkStatus> {
        self.status.subscribe()
    }
}

impl Default for NetworkMonitor {
    fn default() -> Self {
        Self::new(NetworkStatus::Offline)
    }
}
