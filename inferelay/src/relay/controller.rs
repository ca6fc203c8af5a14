//! Relay controller driving one event through the state machine.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

use crate::config::RelayConfig;
use crate::core::{Artifact, ArtifactEvent, PredictionResult, RelayOutcome, RelayState, ResultRecord};
use crate::errors::RelayError;
use crate::events::{EventSink, NoOpEventSink, RelayEvent};
use crate::fetch::ArtifactFetcher;
use crate::predict::PredictionClient;
use crate::retry::{should_retry, RetryConfig, RetryDecision, RetryState};
use crate::source::MessageSource;
use crate::store::ResultStore;

/// Drives events through `Received → Fetching → Predicting → Packaging →
/// Storing → Acknowledged`, with `Failed` terminal on any non-retryable
/// error.
///
/// Processing one event is a pure function of the event and the four
/// collaborators: no state is shared across events beyond the idempotent
/// store, so concurrent `process` calls are independent.
pub struct RelayController {
    source: Arc<dyn MessageSource>,
    fetcher: Arc<dyn ArtifactFetcher>,
    predictor: Arc<dyn PredictionClient>,
    store: Arc<dyn ResultStore>,
    sink: Arc<dyn EventSink>,
    fetch_retry: RetryConfig,
    predict_timeout_retries: usize,
    event_deadline: std::time::Duration,
}

impl RelayController {
    /// Creates a controller over the four collaborators.
    #[must_use]
    pub fn new(
        config: &RelayConfig,
        source: Arc<dyn MessageSource>,
        fetcher: Arc<dyn ArtifactFetcher>,
        predictor: Arc<dyn PredictionClient>,
        store: Arc<dyn ResultStore>,
    ) -> Self {
        Self {
            source,
            fetcher,
            predictor,
            store,
            sink: Arc::new(NoOpEventSink),
            fetch_retry: config.fetch_retry.clone(),
            predict_timeout_retries: config.scoring.timeout_retries,
            event_deadline: config.worker.event_deadline(),
        }
    }

    /// Sets the observability sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Processes one event delivery to a terminal outcome.
    ///
    /// On success the delivery is acknowledged; on failure it is left
    /// unacknowledged so the channel redelivers it, and the failure is
    /// reported to the sink with reference, stage, and error detail.
    /// Never panics and never returns a non-terminal state.
    pub async fn process(&self, event: &ArtifactEvent) -> RelayOutcome {
        let start = Instant::now();
        self.sink.emit(RelayEvent::received(&event.reference)).await;

        let stage = Arc::new(Mutex::new(RelayState::Received));
        let mut fetch_attempts = 0usize;
        let mut predict_attempts = 0usize;

        let driven = tokio::time::timeout(
            self.event_deadline,
            self.drive(event, &stage, &mut fetch_attempts, &mut predict_attempts),
        )
        .await;

        let outcome = match driven {
            Ok(Ok(())) => RelayOutcome::acknowledged(&event.reference),
            Ok(Err((failed_stage, error))) => {
                RelayOutcome::failed(&event.reference, failed_stage, error)
            }
            Err(_) => {
                let failed_stage = *stage.lock();
                RelayOutcome::failed(
                    &event.reference,
                    failed_stage,
                    RelayError::DeadlineExceeded {
                        reference: event.reference.clone(),
                        deadline_ms: self.event_deadline.as_millis() as u64,
                    },
                )
            }
        };

        let outcome = outcome
            .with_attempts(fetch_attempts, predict_attempts)
            .with_duration_ms(start.elapsed().as_secs_f64() * 1000.0);

        if outcome.is_acknowledged() {
            self.sink.emit(RelayEvent::acknowledged(&outcome)).await;
        } else {
            self.sink.emit(RelayEvent::failed(&outcome)).await;
        }

        outcome
    }

    /// Runs the sequential steps of one processing cycle.
    ///
    /// Returns the stage and cause on the first non-retryable error or
    /// retry exhaustion.
    async fn drive(
        &self,
        event: &ArtifactEvent,
        stage: &Mutex<RelayState>,
        fetch_attempts: &mut usize,
        predict_attempts: &mut usize,
    ) -> Result<(), (RelayState, RelayError)> {
        *stage.lock() = RelayState::Fetching;
        let artifact = self
            .fetch_with_retry(event, fetch_attempts)
            .await
            .map_err(|e| (RelayState::Fetching, e))?;

        *stage.lock() = RelayState::Predicting;
        let prediction = self
            .predict_with_retry(event, &artifact, predict_attempts)
            .await
            .map_err(|e| (RelayState::Predicting, e))?;

        *stage.lock() = RelayState::Packaging;
        let record = ResultRecord::package(&prediction);

        *stage.lock() = RelayState::Storing;
        self.store
            .store(&record)
            .await
            .map_err(|e| (RelayState::Storing, e))?;

        self.source
            .acknowledge(&event.token)
            .await
            .map_err(|e| (RelayState::Storing, e))?;

        *stage.lock() = RelayState::Acknowledged;
        Ok(())
    }

    async fn fetch_with_retry(
        &self,
        event: &ArtifactEvent,
        attempts: &mut usize,
    ) -> Result<Artifact, RelayError> {
        let mut state = RetryState::new();

        loop {
            *attempts += 1;
            match self.fetcher.fetch(&event.reference).await {
                Ok(artifact) => return Ok(artifact),
                Err(error) => {
                    match should_retry(&mut state, &self.fetch_retry, error.is_retryable()) {
                        RetryDecision::Retry(delay) => {
                            tracing::debug!(
                                reference = %event.reference,
                                retry = state.retries,
                                error = %error,
                                "Retrying artifact fetch"
                            );
                            self.sink.try_emit(RelayEvent::retried(
                                &event.reference,
                                RelayState::Fetching,
                                *attempts,
                            ));
                            tokio::time::sleep(delay).await;
                        }
                        RetryDecision::GiveUp | RetryDecision::NotRetryable => return Err(error),
                    }
                }
            }
        }
    }

    async fn predict_with_retry(
        &self,
        event: &ArtifactEvent,
        artifact: &Artifact,
        attempts: &mut usize,
    ) -> Result<PredictionResult, RelayError> {
        let mut timeouts = 0usize;

        loop {
            *attempts += 1;
            match self.predictor.predict(artifact).await {
                Ok(result) => return Ok(result),
                Err(error @ RelayError::PredictionTimeout { .. })
                    if timeouts < self.predict_timeout_retries =>
                {
                    timeouts += 1;
                    tracing::debug!(
                        reference = %event.reference,
                        retry = timeouts,
                        error = %error,
                        "Retrying timed-out prediction"
                    );
                    self.sink.try_emit(RelayEvent::retried(
                        &event.reference,
                        RelayState::Predicting,
                        *attempts,
                    ));
                }
                Err(error) => return Err(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChannelConfig, ScoringConfig, StoreConfig};
    use crate::core::derive_store_key;
    use crate::events::CollectingEventSink;
    use crate::retry::JitterStrategy;
    use crate::source::InMemoryMessageSource;
    use crate::store::InMemoryResultStore;
    use crate::testing::{MockFetcher, MockPredictionClient};
    use std::time::Duration;

    fn test_config() -> RelayConfig {
        RelayConfig::new(
            ChannelConfig::new("http://channel.local", "sub"),
            StoreConfig::new("http://store.local"),
            ScoringConfig::new("http://scoring.local", "classifier-v3"),
        )
        .with_fetch_retry(
            RetryConfig::new()
                .with_max_retries(3)
                .with_backoff_base_ms(1)
                .with_jitter(JitterStrategy::None),
        )
    }

    struct Harness {
        source: Arc<InMemoryMessageSource>,
        fetcher: Arc<MockFetcher>,
        predictor: Arc<MockPredictionClient>,
        store: Arc<InMemoryResultStore>,
        sink: Arc<CollectingEventSink>,
        controller: RelayController,
    }

    fn harness(config: RelayConfig) -> Harness {
        let source = Arc::new(InMemoryMessageSource::default());
        let fetcher = Arc::new(MockFetcher::new());
        let predictor = Arc::new(MockPredictionClient::new("classifier-v3"));
        let store = Arc::new(InMemoryResultStore::new());
        let sink = Arc::new(CollectingEventSink::new());

        let controller = RelayController::new(
            &config,
            source.clone(),
            fetcher.clone(),
            predictor.clone(),
            store.clone(),
        )
        .with_sink(sink.clone());

        Harness {
            source,
            fetcher,
            predictor,
            store,
            sink,
            controller,
        }
    }

    async fn deliver(source: &InMemoryMessageSource, reference: &str) -> ArtifactEvent {
        source.publish(reference);
        source
            .receive(1, Duration::ZERO)
            .await
            .unwrap()
            .remove(0)
    }

    #[tokio::test]
    async fn test_happy_path_stores_and_acknowledges() {
        let h = harness(test_config());
        let event = deliver(&h.source, "dicom/abc").await;

        let outcome = h.controller.process(&event).await;

        assert!(outcome.is_acknowledged());
        assert_eq!(outcome.fetch_attempts, 1);
        assert_eq!(outcome.predict_attempts, 1);
        assert!(h.store.get(&derive_store_key("dicom/abc")).is_some());
        assert_eq!(h.source.in_flight_len(), 0);
        assert_eq!(h.sink.events_of_type("relay.acknowledged").len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_recovers_after_transient_failures() {
        let h = harness(test_config());
        h.fetcher.fail_times(2, || RelayError::transient_fetch("dicom/abc", "reset"));

        let event = deliver(&h.source, "dicom/abc").await;
        let outcome = h.controller.process(&event).await;

        assert!(outcome.is_acknowledged());
        assert_eq!(outcome.fetch_attempts, 3);
        assert_eq!(h.fetcher.call_count(), 3);
    }

    #[tokio::test]
    async fn test_artifact_not_found_fails_without_retry() {
        let h = harness(test_config());
        h.fetcher.always_fail(|| RelayError::not_found("dicom/ghost"));

        let event = deliver(&h.source, "dicom/ghost").await;
        let outcome = h.controller.process(&event).await;

        assert_eq!(outcome.state, RelayState::Failed);
        assert_eq!(outcome.failed_at, Some(RelayState::Fetching));
        assert_eq!(h.fetcher.call_count(), 1);
        // Unacknowledged: the delivery stays in flight for redelivery.
        assert_eq!(h.source.in_flight_len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_retry_exhaustion_fails() {
        let h = harness(test_config());
        h.fetcher.always_fail(|| RelayError::transient_fetch("dicom/abc", "reset"));

        let event = deliver(&h.source, "dicom/abc").await;
        let outcome = h.controller.process(&event).await;

        assert_eq!(outcome.state, RelayState::Failed);
        assert_eq!(outcome.failed_at, Some(RelayState::Fetching));
        assert_eq!(h.fetcher.call_count(), 4); // initial + 3 retries
    }

    #[tokio::test]
    async fn test_prediction_timeout_retried_then_reported() {
        let h = harness(test_config());
        h.predictor.always_fail(|| RelayError::PredictionTimeout {
            reference: "dicom/abc".into(),
            timeout_ms: 50,
        });

        let event = deliver(&h.source, "dicom/abc").await;
        let outcome = h.controller.process(&event).await;

        assert_eq!(outcome.state, RelayState::Failed);
        assert_eq!(outcome.failed_at, Some(RelayState::Predicting));
        // timeout_retries defaults to 2: initial + 2 retries.
        assert_eq!(outcome.predict_attempts, 3);

        let failed = h.sink.events_of_type("relay.failed");
        assert_eq!(failed.len(), 1);
        let error = failed[0].data.get("error").unwrap();
        assert_eq!(error.get("kind").unwrap(), "prediction_timeout");
    }

    #[tokio::test]
    async fn test_prediction_rejection_not_retried() {
        let h = harness(test_config());
        h.predictor
            .always_fail(|| RelayError::prediction_service("400", "malformed payload"));

        let event = deliver(&h.source, "dicom/abc").await;
        let outcome = h.controller.process(&event).await;

        assert_eq!(outcome.state, RelayState::Failed);
        assert_eq!(outcome.predict_attempts, 1);
    }

    #[tokio::test]
    async fn test_store_rejection_is_terminal() {
        let h = harness(test_config());
        h.predictor.set_label(" ");

        let event = deliver(&h.source, "dicom/abc").await;
        let outcome = h.controller.process(&event).await;

        assert_eq!(outcome.state, RelayState::Failed);
        assert_eq!(outcome.failed_at, Some(RelayState::Storing));
        assert_eq!(
            outcome.error.as_ref().map(RelayError::kind),
            Some("store_rejected")
        );
        assert_eq!(h.source.in_flight_len(), 1);
    }

    #[tokio::test]
    async fn test_deadline_forces_failed_outcome() {
        let mut config = test_config();
        config.worker.event_deadline_ms = 20;
        let h = harness(config);
        h.fetcher.set_delay(Duration::from_millis(200));

        let event = deliver(&h.source, "dicom/abc").await;
        let outcome = h.controller.process(&event).await;

        assert_eq!(outcome.state, RelayState::Failed);
        assert_eq!(outcome.failed_at, Some(RelayState::Fetching));
        assert_eq!(
            outcome.error.as_ref().map(RelayError::kind),
            Some("deadline_exceeded")
        );
    }

    #[tokio::test]
    async fn test_redelivery_overwrites_same_record() {
        let h = harness(test_config());

        let first = deliver(&h.source, "dicom/abc").await;
        let outcome = h.controller.process(&first).await;
        assert!(outcome.is_acknowledged());

        // Simulate redelivery of the same artifact after a crash: process
        // again under a fresh token.
        let second = deliver(&h.source, "dicom/abc").await;
        let outcome = h.controller.process(&second).await;
        assert!(outcome.is_acknowledged());

        assert_eq!(h.store.len(), 1);
    }
}
