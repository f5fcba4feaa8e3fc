//! # Sync State
//!
//! What screens read to render sync status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Generic message stored in `sync_error` after a failed pass
pub const SYNC_ERROR_MESSAGE: &str = "Some actions could not be synced. They will be retried.";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    /// Mirrors the (settled) network status
    pub is_online: bool,
    /// Set when every action attempted by a pass succeeded
    pub last_sync_time: Option<DateTime<Utc>>,
    /// Set on a failed pass, cleared explicitly or by the next clean pass
    pub sync_error: Option<String>,
    /// True while a pass is running
    pub is_loading: bool,
}

impl SyncState {
    pub fn is_offline(&self) -> bool {
        !self.is_online
    }
}
