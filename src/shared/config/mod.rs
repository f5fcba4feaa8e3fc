//! Application configuration module
//!
//! Tunables for the offline core. Values come from defaults, environment
//! variables (`SITEFORCE_API_URL`, `SITEFORCE_DB_PATH`) or a TOML document,
//! and are always validated before use.
//!
//! ```rust
//! use siteforce_offline::shared::config::{AppConfig, OverflowPolicy};
//!
//! let config = AppConfig::builder()
//!     .server_url("https://erp.example.com".to_string())
//!     .queue_capacity(100)
//!     .overflow_policy(OverflowPolicy::DropOldest)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.queue_capacity, 100);
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default server URL
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";

/// Largest accepted stale threshold, one year
pub const MAX_STALE_THRESHOLD_MINUTES: i64 = 365 * 24 * 60;

/// What happens when an action is queued while the queue is at capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Refuse the new action; the caller must surface "sync required"
    #[default]
    RejectNew,
    /// Evict the oldest queued action to the dead-letter list
    DropOldest,
}

/// How a sync pass reacts to a failed action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrainPolicy {
    /// Keep going; each action succeeds or fails on its own
    #[default]
    Independent,
    /// Abort the pass at the first failure, leaving later actions queued
    StopOnFirstFailure,
}

/// Retry and backoff settings for queued actions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Delay after the first failure, in milliseconds
    pub base_delay_ms: u64,
    /// Upper bound for any single delay, in milliseconds
    pub max_delay_ms: u64,
    /// Jitter factor (0.0 to 1.0) added on top of the exponential delay
    pub jitter: f64,
    /// Failed attempts after which an action is dead-lettered
    pub max_attempts: u32,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            base_delay_ms: 1_000,
            max_delay_ms: 300_000,
            jitter: 0.1,
            max_attempts: 5,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the ERP backend
    pub server_url: String,
    /// Per-request HTTP timeout in seconds
    pub request_timeout_secs: u64,
    /// Maximum number of queued actions
    pub queue_capacity: usize,
    /// Behaviour when the queue is full
    pub overflow_policy: OverflowPolicy,
    /// Behaviour of a sync pass on failure
    pub drain_policy: DrainPolicy,
    /// Retry/backoff settings
    pub retry: RetrySettings,
    /// Age of the last sync after which cached data counts as stale
    pub stale_threshold_minutes: i64,
    /// How long a connectivity change must hold before it is acted on
    pub connectivity_settle_ms: u64,
    /// Interval of the background retry tick in seconds, 0 disables it
    pub retry_tick_secs: u64,
    /// Domains rehydrated from the cache at startup
    pub cached_domains: Vec<String>,
    /// SQLite file location, platform data dir when unset
    pub db_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            request_timeout_secs: 30,
            queue_capacity: 500,
            overflow_policy: OverflowPolicy::default(),
            drain_policy: DrainPolicy::default(),
            retry: RetrySettings::default(),
            stale_threshold_minutes: 30,
            connectivity_settle_ms: 2_000,
            retry_tick_secs: 60,
            cached_domains: vec!["tasks".to_string(), "attendance".to_string()],
            db_path: None,
        }
    }
}

impl AppConfig {
    /// Create a new AppConfigBuilder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Defaults overlaid with `SITEFORCE_API_URL` and `SITEFORCE_DB_PATH`
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut builder = Self::builder();
        if let Ok(url) = std::env::var("SITEFORCE_API_URL") {
            builder = builder.server_url(url);
        }
        if let Ok(path) = std::env::var("SITEFORCE_DB_PATH") {
            builder = builder.db_path(PathBuf::from(path));
        }
        builder.build()
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: AppConfig =
            toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.server_url.starts_with("http://") || self.server_url.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl(self.server_url.clone()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::invalid("request_timeout_secs", "must be positive"));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::invalid("queue_capacity", "must be positive"));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::invalid("retry.max_attempts", "must be positive"));
        }
        if !(0.0..=1.0).contains(&self.retry.jitter) {
            return Err(ConfigError::invalid("retry.jitter", "must be within 0.0..=1.0"));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(ConfigError::invalid(
                "retry.base_delay_ms",
                "must not exceed retry.max_delay_ms",
            ));
        }
        if !(1..=MAX_STALE_THRESHOLD_MINUTES).contains(&self.stale_threshold_minutes) {
            return Err(ConfigError::invalid(
                "stale_threshold_minutes",
                format!("must be within 1..={}", MAX_STALE_THRESHOLD_MINUTES),
            ));
        }
        if self.cached_domains.iter().any(|d| d.trim().is_empty()) {
            return Err(ConfigError::invalid("cached_domains", "domain names must not be empty"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connectivity_settle(&self) -> Duration {
        Duration::from_millis(self.connectivity_settle_ms)
    }

    /// `None` when the periodic retry tick is disabled
    pub fn retry_tick(&self) -> Option<Duration> {
        (self.retry_tick_secs > 0).then(|| Duration::from_secs(self.retry_tick_secs))
    }

    /// Clamped to the accepted range for configs that skipped `validate`
    pub fn stale_threshold(&self) -> chrono::Duration {
        chrono::Duration::minutes(
            self.stale_threshold_minutes
                .clamp(1, MAX_STALE_THRESHOLD_MINUTES),
        )
    }
}

/// Builder for AppConfig
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    /// Set the server URL
    pub fn server_url(mut self, url: String) -> Self {
        self.config.server_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.config.overflow_policy = policy;
        self
    }

    pub fn drain_policy(mut self, policy: DrainPolicy) -> Self {
        self.config.drain_policy = policy;
        self
    }

    pub fn retry(mut self, retry: RetrySettings) -> Self {
        self.config.retry = retry;
        self
    }

    pub fn stale_threshold_minutes(mut self, minutes: i64) -> Self {
        self.config.stale_threshold_minutes = minutes;
        self
    }

    pub fn connectivity_settle_ms(mut self, millis: u64) -> Self {
        self.config.connectivity_settle_ms = millis;
        self
    }

    pub fn retry_tick_secs(mut self, secs: u64) -> Self {
        self.config.retry_tick_secs = secs;
        self
    }

    pub fn cached_domains(mut self, domains: Vec<String>) -> Self {
        self.config.cached_domains = domains;
        self
    }

    pub fn db_path(mut self, path: PathBuf) -> Self {
        self.config.db_path = Some(path);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Configuration errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: &'static str, message: String },
    #[error("failed to parse configuration: {0}")]
    Parse(String),
}

impl ConfigError {
    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            message: message.into(),
        }
    }
}
