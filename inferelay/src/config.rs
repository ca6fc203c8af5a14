//! Relay configuration.
//!
//! Configuration is assembled once at startup and never mutated afterwards;
//! every component receives the piece it needs at construction.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::RelayError;
use crate::retry::RetryConfig;

/// Configuration for the message channel subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Base URL of the messaging channel.
    pub endpoint: String,
    /// Subscription to pull events from.
    pub subscription: String,
    /// Maximum events returned by a single pull.
    #[serde(default = "default_pull_batch")]
    pub max_batch: usize,
    /// Bounded wait for a pull that finds no events, in milliseconds.
    #[serde(default = "default_poll_wait_ms")]
    pub poll_wait_ms: u64,
}

fn default_pull_batch() -> usize {
    16
}

fn default_poll_wait_ms() -> u64 {
    5_000
}

impl ChannelConfig {
    /// Creates a channel config for the given endpoint and subscription.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, subscription: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            subscription: subscription.into(),
            max_batch: default_pull_batch(),
            poll_wait_ms: default_poll_wait_ms(),
        }
    }

    /// Sets the pull batch size.
    #[must_use]
    pub fn with_max_batch(mut self, max_batch: usize) -> Self {
        self.max_batch = max_batch;
        self
    }

    /// Sets the idle poll wait.
    #[must_use]
    pub fn with_poll_wait_ms(mut self, wait: u64) -> Self {
        self.poll_wait_ms = wait;
        self
    }

    /// The idle poll wait as a duration.
    #[must_use]
    pub fn poll_wait(&self) -> Duration {
        Duration::from_millis(self.poll_wait_ms)
    }
}

/// Configuration for the canonical artifact/result store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base URL of the canonical store.
    pub endpoint: String,
    /// Request timeout in milliseconds.
    #[serde(default = "default_store_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_store_timeout_ms() -> u64 {
    15_000
}

impl StoreConfig {
    /// Creates a store config for the given endpoint.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout_ms: default_store_timeout_ms(),
        }
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout: u64) -> Self {
        self.timeout_ms = timeout;
        self
    }

    /// The request timeout as a duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Configuration for the scoring endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Base URL of the scoring endpoint.
    pub endpoint: String,
    /// Model/version identifier sent with every request.
    pub model: String,
    /// Round-trip timeout in milliseconds. Scoring services may queue under
    /// load, so this must exceed typical queueing delay.
    #[serde(default = "default_predict_timeout_ms")]
    pub timeout_ms: u64,
    /// Retries after a timed-out prediction before giving up.
    #[serde(default = "default_predict_retries")]
    pub timeout_retries: usize,
}

fn default_predict_timeout_ms() -> u64 {
    30_000
}

fn default_predict_retries() -> usize {
    2
}

impl ScoringConfig {
    /// Creates a scoring config for the given endpoint and model.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            timeout_ms: default_predict_timeout_ms(),
            timeout_retries: default_predict_retries(),
        }
    }

    /// Sets the round-trip timeout.
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout: u64) -> Self {
        self.timeout_ms = timeout;
        self
    }

    /// Sets the timeout retry bound.
    #[must_use]
    pub fn with_timeout_retries(mut self, retries: usize) -> Self {
        self.timeout_retries = retries;
        self
    }

    /// The round-trip timeout as a duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Configuration for the relay worker pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Maximum events processed concurrently.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Overall per-event deadline in milliseconds.
    #[serde(default = "default_event_deadline_ms")]
    pub event_deadline_ms: u64,
}

fn default_concurrency() -> usize {
    8
}

fn default_event_deadline_ms() -> u64 {
    60_000
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            event_deadline_ms: default_event_deadline_ms(),
        }
    }
}

impl WorkerConfig {
    /// Creates a worker config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the concurrency limit.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Sets the per-event deadline.
    #[must_use]
    pub fn with_event_deadline_ms(mut self, deadline: u64) -> Self {
        self.event_deadline_ms = deadline;
        self
    }

    /// The per-event deadline as a duration.
    #[must_use]
    pub fn event_deadline(&self) -> Duration {
        Duration::from_millis(self.event_deadline_ms)
    }
}

/// Complete relay configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Message channel settings.
    pub channel: ChannelConfig,
    /// Canonical store settings.
    pub store: StoreConfig,
    /// Scoring endpoint settings.
    pub scoring: ScoringConfig,
    /// Artifact fetch retry tuning.
    #[serde(default)]
    pub fetch_retry: RetryConfig,
    /// Worker pool settings.
    #[serde(default)]
    pub worker: WorkerConfig,
}

impl RelayConfig {
    /// Creates a relay config from the three endpoint configs.
    #[must_use]
    pub fn new(channel: ChannelConfig, store: StoreConfig, scoring: ScoringConfig) -> Self {
        Self {
            channel,
            store,
            scoring,
            fetch_retry: RetryConfig::default(),
            worker: WorkerConfig::default(),
        }
    }

    /// Sets the fetch retry tuning.
    #[must_use]
    pub fn with_fetch_retry(mut self, retry: RetryConfig) -> Self {
        self.fetch_retry = retry;
        self
    }

    /// Sets the worker pool settings.
    #[must_use]
    pub fn with_worker(mut self, worker: WorkerConfig) -> Self {
        self.worker = worker;
        self
    }

    /// Validates the configuration at startup.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::Config` for empty endpoints, an empty model
    /// reference, a zero concurrency limit, or a zero event deadline.
    pub fn validate(&self) -> Result<(), RelayError> {
        if self.channel.endpoint.trim().is_empty() {
            return Err(RelayError::Config("channel endpoint is empty".into()));
        }
        if self.channel.subscription.trim().is_empty() {
            return Err(RelayError::Config("channel subscription is empty".into()));
        }
        if self.store.endpoint.trim().is_empty() {
            return Err(RelayError::Config("store endpoint is empty".into()));
        }
        if self.scoring.endpoint.trim().is_empty() {
            return Err(RelayError::Config("scoring endpoint is empty".into()));
        }
        if self.scoring.model.trim().is_empty() {
            return Err(RelayError::Config("model reference is empty".into()));
        }
        if self.worker.concurrency == 0 {
            return Err(RelayError::Config("worker concurrency must be > 0".into()));
        }
        if self.worker.event_deadline_ms == 0 {
            return Err(RelayError::Config("event deadline must be > 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> RelayConfig {
        RelayConfig::new(
            ChannelConfig::new("http://channel.local", "new-artifacts"),
            StoreConfig::new("http://store.local"),
            ScoringConfig::new("http://scoring.local", "classifier-v3"),
        )
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_empty_endpoint_rejected() {
        let mut config = valid_config();
        config.store.endpoint = "  ".into();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("store endpoint"));
    }

    #[test]
    fn test_empty_model_rejected() {
        let mut config = valid_config();
        config.scoring.model = String::new();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut config = valid_config();
        config.worker.concurrency = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_defaults() {
        let config = valid_config();
        assert_eq!(config.worker.concurrency, 8);
        assert_eq!(config.channel.max_batch, 16);
        assert_eq!(config.scoring.timeout_retries, 2);
        assert_eq!(config.scoring.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_builder_overrides() {
        let config = valid_config()
            .with_worker(WorkerConfig::new().with_concurrency(2).with_event_deadline_ms(1000))
            .with_fetch_retry(RetryConfig::new().with_max_retries(5));

        assert_eq!(config.worker.concurrency, 2);
        assert_eq!(config.worker.event_deadline(), Duration::from_secs(1));
        assert_eq!(config.fetch_retry.max_retries, 5);
    }

    #[test]
    fn test_config_roundtrips_through_json() {
        let config = valid_config();
        let json = serde_json::to_string(&config).unwrap();
        let back: RelayConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(back.channel.subscription, "new-artifacts");
        assert_eq!(back.scoring.model, "classifier-v3");
    }
}
