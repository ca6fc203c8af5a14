//! Retry utilities with configurable backoff and jitter strategies.
//!
//! Provides bounded retry handling for transient failures. Errors the
//! caller classifies as permanent exit the loop immediately; transient
//! errors are retried up to `max_retries` with backoff.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backoff strategy for retry delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// delay = base * 2^attempt
    #[default]
    Exponential,
    /// delay = base * (attempt + 1)
    Linear,
    /// delay = base (constant)
    Constant,
}

/// Jitter strategy to prevent thundering herd.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterStrategy {
    /// No jitter
    None,
    /// Random from 0 to delay
    #[default]
    Full,
    /// Half fixed, half random
    Equal,
}

/// Configuration for retry behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum retries after the initial attempt (0 = no retries).
    pub max_retries: usize,
    /// Base delay between retries in milliseconds.
    pub backoff_base_ms: u64,
    /// Maximum delay cap in milliseconds.
    pub max_delay_ms: u64,
    /// Backoff strategy.
    pub backoff_strategy: BackoffStrategy,
    /// Jitter strategy.
    pub jitter_strategy: JitterStrategy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base_ms: 250,
            max_delay_ms: 10_000,
            backoff_strategy: BackoffStrategy::Exponential,
            jitter_strategy: JitterStrategy::Full,
        }
    }
}

impl RetryConfig {
    /// Creates a new retry config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum retries.
    #[must_use]
    pub fn with_max_retries(mut self, retries: usize) -> Self {
        self.max_retries = retries;
        self
    }

    /// Sets the base delay.
    #[must_use]
    pub fn with_backoff_base_ms(mut self, delay: u64) -> Self {
        self.backoff_base_ms = delay;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub fn with_max_delay_ms(mut self, delay: u64) -> Self {
        self.max_delay_ms = delay;
        self
    }

    /// Sets the backoff strategy.
    #[must_use]
    pub fn with_backoff(mut self, strategy: BackoffStrategy) -> Self {
        self.backoff_strategy = strategy;
        self
    }

    /// Sets the jitter strategy.
    #[must_use]
    pub fn with_jitter(mut self, strategy: JitterStrategy) -> Self {
        self.jitter_strategy = strategy;
        self
    }
}

/// State tracking for one retried operation.
#[derive(Debug, Default)]
pub struct RetryState {
    /// Number of retries performed so far.
    pub retries: usize,
}

impl RetryState {
    /// Creates a new retry state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if retries are exhausted.
    #[must_use]
    pub fn is_exhausted(&self, config: &RetryConfig) -> bool {
        self.retries >= config.max_retries
    }

    /// Calculates the delay for the next retry.
    #[must_use]
    pub fn calculate_delay(&self, config: &RetryConfig) -> Duration {
        let base = config.backoff_base_ms;
        let max = config.max_delay_ms;
        let attempt = self.retries;

        let delay = match config.backoff_strategy {
            BackoffStrategy::Exponential => {
                let exp_delay = base.saturating_mul(2u64.saturating_pow(attempt as u32));
                exp_delay.min(max)
            }
            BackoffStrategy::Linear => {
                let linear_delay = base.saturating_mul((attempt + 1) as u64);
                linear_delay.min(max)
            }
            BackoffStrategy::Constant => base.min(max),
        };

        let jittered = match config.jitter_strategy {
            JitterStrategy::None => delay,
            JitterStrategy::Full => {
                if delay == 0 {
                    0
                } else {
                    rand::thread_rng().gen_range(0..=delay)
                }
            }
            JitterStrategy::Equal => {
                let half = delay / 2;
                if half == 0 {
                    delay
                } else {
                    half + rand::thread_rng().gen_range(0..=half)
                }
            }
        };

        Duration::from_millis(jittered)
    }
}

/// Outcome of a retry decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry(Duration),
    /// Retries exhausted, give up.
    GiveUp,
    /// The error is permanent, do not retry.
    NotRetryable,
}

/// Makes a retry decision for an error the caller has already classified.
#[must_use]
pub fn should_retry(
    state: &mut RetryState,
    config: &RetryConfig,
    retryable: bool,
) -> RetryDecision {
    if !retryable {
        return RetryDecision::NotRetryable;
    }
    if state.is_exhausted(config) {
        return RetryDecision::GiveUp;
    }

    let delay = state.calculate_delay(config);
    state.retries += 1;

    RetryDecision::Retry(delay)
}

/// Executes an operation with bounded retries.
///
/// `is_retryable` classifies each error; permanent errors are returned
/// immediately without consuming a retry. On exhaustion the last error is
/// returned. The total number of attempts is `max_retries + 1`.
pub async fn with_retry<T, E, F, Fut, P>(
    config: &RetryConfig,
    operation_name: &str,
    is_retryable: P,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut state = RetryState::new();

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => match should_retry(&mut state, config, is_retryable(&e)) {
                RetryDecision::Retry(delay) => {
                    tracing::debug!(
                        operation = %operation_name,
                        retry = state.retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying after transient error"
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::GiveUp | RetryDecision::NotRetryable => {
                    return Err(e);
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.backoff_base_ms, 250);
        assert_eq!(config.backoff_strategy, BackoffStrategy::Exponential);
    }

    #[test]
    fn test_retry_config_builder() {
        let config = RetryConfig::new()
            .with_max_retries(5)
            .with_backoff_base_ms(500)
            .with_max_delay_ms(5000)
            .with_backoff(BackoffStrategy::Linear)
            .with_jitter(JitterStrategy::None);

        assert_eq!(config.max_retries, 5);
        assert_eq!(config.backoff_base_ms, 500);
        assert_eq!(config.max_delay_ms, 5000);
        assert_eq!(config.backoff_strategy, BackoffStrategy::Linear);
        assert_eq!(config.jitter_strategy, JitterStrategy::None);
    }

    #[test]
    fn test_calculate_delay_exponential_no_jitter() {
        let config = RetryConfig::new()
            .with_backoff_base_ms(100)
            .with_jitter(JitterStrategy::None);

        let mut state = RetryState::new();

        state.retries = 0;
        assert_eq!(state.calculate_delay(&config), Duration::from_millis(100));

        state.retries = 1;
        assert_eq!(state.calculate_delay(&config), Duration::from_millis(200));

        state.retries = 2;
        assert_eq!(state.calculate_delay(&config), Duration::from_millis(400));
    }

    #[test]
    fn test_calculate_delay_capped_at_max() {
        let config = RetryConfig::new()
            .with_backoff_base_ms(1000)
            .with_max_delay_ms(5000)
            .with_jitter(JitterStrategy::None);

        let mut state = RetryState::new();
        state.retries = 10;

        assert_eq!(state.calculate_delay(&config), Duration::from_millis(5000));
    }

    #[test]
    fn test_calculate_delay_full_jitter_bounded() {
        let config = RetryConfig::new()
            .with_backoff_base_ms(100)
            .with_backoff(BackoffStrategy::Constant)
            .with_jitter(JitterStrategy::Full);

        let state = RetryState::new();

        for _ in 0..10 {
            assert!(state.calculate_delay(&config) <= Duration::from_millis(100));
        }
    }

    #[test]
    fn test_should_retry_not_retryable_short_circuits() {
        let config = RetryConfig::new().with_max_retries(3);
        let mut state = RetryState::new();

        let decision = should_retry(&mut state, &config, false);
        assert_eq!(decision, RetryDecision::NotRetryable);
        assert_eq!(state.retries, 0);
    }

    #[test]
    fn test_should_retry_exhaustion() {
        let config = RetryConfig::new()
            .with_max_retries(2)
            .with_jitter(JitterStrategy::None);
        let mut state = RetryState::new();

        assert!(matches!(
            should_retry(&mut state, &config, true),
            RetryDecision::Retry(_)
        ));
        assert!(matches!(
            should_retry(&mut state, &config, true),
            RetryDecision::Retry(_)
        ));
        assert_eq!(should_retry(&mut state, &config, true), RetryDecision::GiveUp);
    }

    #[tokio::test]
    async fn test_with_retry_success_first_try() {
        let config = RetryConfig::new();
        let mut calls = 0;

        let result: Result<i32, String> = with_retry(&config, "test", |_| true, || {
            calls += 1;
            async { Ok(42) }
        })
        .await;

        assert_eq!(result, Ok(42));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_with_retry_success_after_failures() {
        let config = RetryConfig::new()
            .with_max_retries(4)
            .with_backoff_base_ms(1)
            .with_jitter(JitterStrategy::None);

        let mut calls = 0;

        let result: Result<i32, String> = with_retry(&config, "test", |_| true, || {
            calls += 1;
            async move {
                if calls < 3 {
                    Err(format!("attempt {calls}"))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(42));
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_with_retry_respects_attempt_bound() {
        let config = RetryConfig::new()
            .with_max_retries(3)
            .with_backoff_base_ms(1)
            .with_jitter(JitterStrategy::None);

        let mut calls = 0;

        let result: Result<i32, String> = with_retry(&config, "test", |_| true, || {
            calls += 1;
            async { Err("always fails".to_string()) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls, 4); // initial + 3 retries
    }

    #[tokio::test]
    async fn test_with_retry_permanent_error_not_retried() {
        let config = RetryConfig::new()
            .with_max_retries(3)
            .with_backoff_base_ms(1);

        let mut calls = 0;

        let result: Result<i32, String> =
            with_retry(&config, "test", |e: &String| e != "permanent", || {
                calls += 1;
                async { Err("permanent".to_string()) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
