//! # Retry Logic and Backoff Strategies
//!
//! Decides when a transiently failed action may be replayed and when to
//! give up on it.
//!
//! ## Features
//!
//! - **Exponential Backoff**: Gradually increase retry intervals
//! - **Jitter**: Add randomness so reconnecting devices don't retry in lockstep
//! - **Max Attempts**: Actions are dead-lettered once attempts run out
//!
//! Retry state lives on the `QueuedAction` itself (`attempts`,
//! `next_attempt_at`, `last_error`) so it survives restarts with the queue.
//!
//! ## Usage
//!
//! ```rust
//! use siteforce_offline::client::offline::retry::{RetryDecision, RetryPolicy};
//! use siteforce_offline::shared::{ActionType, QueuedAction, RetrySettings};
//!
//! let policy = RetryPolicy::from_settings(&RetrySettings::default());
//! let mut action = QueuedAction::new(ActionType::ClockIn, serde_json::json!({}));
//!
//! match policy.record_failure(&mut action, "connection reset", chrono::Utc::now()) {
//!     RetryDecision::RetryAt(_) => assert_eq!(action.attempts, 1),
//!     RetryDecision::GiveUp => unreachable!(),
//! }
//! ```

use crate::shared::{QueuedAction, RetrySettings};
use chrono::{DateTime, Utc};
use rand::Rng;
use std::time::Duration;

/// Backoff strategy configuration
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    /// Fixed interval between retries
    Fixed {
        interval: Duration,
    },
    /// Exponential backoff with jitter
    Exponential {
        /// Delay after the first failure
        base: Duration,
        /// Cap for any single delay before jitter
        max: Duration,
        /// Jitter factor (0.0 to 1.0)
        jitter: f64,
    },
}

/// Outcome of recording a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Replay no earlier than this instant
    RetryAt(DateTime<Utc>),
    /// Attempts exhausted
    GiveUp,
}

/// Per-action retry policy
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    strategy: BackoffStrategy,
    max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(strategy: BackoffStrategy, max_attempts: u32) -> Self {
        Self {
            strategy,
            max_attempts,
        }
    }

    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self::new(
            BackoffStrategy::Exponential {
                base: Duration::from_millis(settings.base_delay_ms),
                max: Duration::from_millis(settings.max_delay_ms),
                jitter: settings.jitter,
            },
            settings.max_attempts,
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn is_exhausted(&self, attempts: u32) -> bool {
        attempts >= self.max_attempts
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match &self.strategy {
            BackoffStrategy::Fixed { interval } => *interval,
            BackoffStrategy::Exponential { base, max, jitter } => {
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
                let delay = base.saturating_mul(factor).min(*max);

                let jitter_ms = (delay.as_millis() as f64 * jitter) as u64;
                if jitter_ms == 0 {
                    delay
                } else {
                    delay + Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
                }
            }
        }
    }

    /// Count a failed attempt on `action` and schedule its next replay
    pub fn record_failure(
        &self,
        action: &mut QueuedAction,
        error: &str,
        now: DateTime<Utc>,
    ) -> RetryDecision {
        action.attempts += 1;
        action.last_error = Some(error.to_string());

        if self.is_exhausted(action.attempts) {
            action.next_attempt_at = None;
            return RetryDecision::GiveUp;
        }

        let delay = chrono::Duration::from_std(self.delay_for(action.attempts))
            .unwrap_or_else(|_| chrono::Duration::seconds(i64::from(u32::MAX)));
        let at = now + delay;
        action.next_attempt_at = Some(at);
        RetryDecision::RetryAt(at)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&RetrySettings::default())
    }
}
