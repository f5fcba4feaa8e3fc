//! Queued Action Types
//!
//! Mutations recorded while the device is offline and replayed against the
//! backend once connectivity returns. The JSON shape is what gets persisted
//! under the `queued_actions` and `failed_actions` storage keys.

use chrono::{DateTime, Utc};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Kinds of mutation that can be queued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    /// Attendance clock-in at a site
    ClockIn,
    /// Attendance clock-out
    ClockOut,
    /// Start work on a task
    StartTask,
    /// Report progress on a task
    UpdateProgress,
    /// Mark a task complete
    CompleteTask,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::ClockIn => "CLOCK_IN",
            ActionType::ClockOut => "CLOCK_OUT",
            ActionType::StartTask => "START_TASK",
            ActionType::UpdateProgress => "UPDATE_PROGRESS",
            ActionType::CompleteTask => "COMPLETE_TASK",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pending mutation waiting to be replayed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedAction {
    /// `<TYPE>_<millis>_<random>`, unique per enqueue
    pub id: String,
    /// Mutation kind
    #[serde(rename = "type")]
    pub action_type: ActionType,
    /// Type-specific data sent as the request body
    pub payload: serde_json::Value,
    /// When the action was queued
    pub created_at: DateTime<Utc>,
    /// Failed replay attempts so far
    #[serde(default)]
    pub attempts: u32,
    /// Sent with every replay so the server can drop duplicates
    pub idempotency_key: Uuid,
    /// Message from the most recent failed attempt
    #[serde(default)]
    pub last_error: Option<String>,
    /// Not replayed before this instant
    #[serde(default)]
    pub next_attempt_at: Option<DateTime<Utc>>,
}

impl QueuedAction {
    /// Create a fresh action stamped with the current time
    pub fn new(action_type: ActionType, payload: serde_json::Value) -> Self {
        let created_at = Utc::now();
        let suffix: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(9)
            .map(|b| char::from(b).to_ascii_lowercase())
            .collect();

        Self {
            id: format!("{}_{}_{}", action_type, created_at.timestamp_millis(), suffix),
            action_type,
            payload,
            created_at,
            attempts: 0,
            idempotency_key: Uuid::new_v4(),
            last_error: None,
            next_attempt_at: None,
        }
    }

    /// Whether the backoff delay (if any) has elapsed
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_attempt_at.map_or(true, |at| at <= now)
    }

    /// `taskId` from the payload, accepting numeric or string ids
    pub fn task_id(&self) -> Option<String> {
        match self.payload.get("taskId")? {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Forget previous failures so the action is retried from scratch
    pub fn reset_attempts(&mut self) {
        self.attempts = 0;
        self.last_error = None;
        self.next_attempt_at = None;
    }
}

/// Why an action left the retry cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// The server refused the action outright
    Rejected { message: String },
    /// Transient failures used up every attempt
    RetriesExhausted { attempts: u32 },
    /// Pushed out of a full queue
    Evicted,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Rejected { message } => write!(f, "rejected by server: {}", message),
            FailureReason::RetriesExhausted { attempts } => {
                write!(f, "gave up after {} attempts", attempts)
            }
            FailureReason::Evicted => f.write_str("evicted from a full queue"),
        }
    }
}

/// An action that will not be retried automatically
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedAction {
    pub action: QueuedAction,
    pub reason: FailureReason,
    pub failed_at: DateTime<Utc>,
}

impl FailedAction {
    pub fn new(action: QueuedAction, reason: FailureReason) -> Self {
        Self {
            action,
            reason,
            failed_at: Utc::now(),
        }
    }
}
