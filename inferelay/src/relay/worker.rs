//! Worker pool pulling events from the message source.

use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::config::{ChannelConfig, WorkerConfig};
use crate::events::{EventSink, NoOpEventSink, RelayEvent};
use crate::retry::{RetryConfig, RetryState};
use crate::shutdown::ShutdownToken;
use crate::source::MessageSource;

use super::controller::RelayController;

/// Pulls events from the source and processes each on an independent task.
///
/// Concurrency is bounded by a semaphore; events have no ordering
/// dependency, so a failure in one task never blocks another. Channel
/// unavailability is retried with backoff. Shutdown is cooperative: the
/// pool stops pulling, then drains in-flight work.
pub struct RelayWorkerPool {
    source: Arc<dyn MessageSource>,
    controller: Arc<RelayController>,
    sink: Arc<dyn EventSink>,
    channel: ChannelConfig,
    worker: WorkerConfig,
    source_backoff: RetryConfig,
    shutdown: Arc<ShutdownToken>,
}

impl RelayWorkerPool {
    /// Creates a pool over the source and controller.
    #[must_use]
    pub fn new(
        channel: ChannelConfig,
        worker: WorkerConfig,
        source: Arc<dyn MessageSource>,
        controller: Arc<RelayController>,
    ) -> Self {
        Self {
            source,
            controller,
            sink: Arc::new(NoOpEventSink),
            channel,
            worker,
            source_backoff: RetryConfig::default(),
            shutdown: Arc::new(ShutdownToken::new()),
        }
    }

    /// Sets the observability sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Sets the backoff used when the channel is unreachable.
    #[must_use]
    pub fn with_source_backoff(mut self, backoff: RetryConfig) -> Self {
        self.source_backoff = backoff;
        self
    }

    /// The token that stops this pool.
    #[must_use]
    pub fn shutdown_token(&self) -> Arc<ShutdownToken> {
        self.shutdown.clone()
    }

    /// Runs until shutdown is requested, then drains in-flight events.
    pub async fn run(&self) {
        let concurrency = self.worker.concurrency;
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let mut backoff = RetryState::new();

        tracing::info!(concurrency, "Relay worker pool started");

        while !self.shutdown.is_shutdown() {
            let received = tokio::select! {
                r = self.source.receive(self.channel.max_batch, self.channel.poll_wait()) => r,
                () = self.shutdown.wait() => break,
            };

            match received {
                Ok(events) => {
                    backoff = RetryState::new();

                    for event in events {
                        let Ok(permit) = semaphore.clone().acquire_owned().await else {
                            break;
                        };

                        let controller = self.controller.clone();
                        tokio::spawn(async move {
                            let _permit = permit;
                            let outcome = controller.process(&event).await;
                            tracing::debug!(
                                reference = %outcome.reference,
                                state = %outcome.state,
                                "Event processing finished"
                            );
                        });
                    }
                }
                Err(error) => {
                    self.sink
                        .try_emit(RelayEvent::channel_unavailable(&error.to_string()));

                    let delay = backoff.calculate_delay(&self.source_backoff);
                    backoff.retries = backoff.retries.saturating_add(1);

                    tracing::warn!(
                        error = %error,
                        delay_ms = delay.as_millis() as u64,
                        "Message channel unavailable, backing off"
                    );

                    tokio::select! {
                        () = tokio::time::sleep(delay) => {}
                        () = self.shutdown.wait() => break,
                    }
                }
            }
        }

        // Drain: every permit back means every in-flight task is done.
        #[allow(clippy::cast_possible_truncation)]
        let _drained = semaphore.acquire_many(concurrency as u32).await;

        tracing::info!(
            reason = self.shutdown.reason().as_deref().unwrap_or("unknown"),
            "Relay worker pool stopped"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RelayConfig, ScoringConfig, StoreConfig};
    use crate::events::CollectingEventSink;
    use crate::source::InMemoryMessageSource;
    use crate::store::InMemoryResultStore;
    use crate::testing::{MockFetcher, MockPredictionClient};
    use std::time::Duration;

    fn pool_harness(
        concurrency: usize,
    ) -> (
        RelayWorkerPool,
        Arc<InMemoryMessageSource>,
        Arc<InMemoryResultStore>,
        Arc<CollectingEventSink>,
    ) {
        let channel = ChannelConfig::new("http://channel.local", "sub").with_poll_wait_ms(20);
        let config = RelayConfig::new(
            channel.clone(),
            StoreConfig::new("http://store.local"),
            ScoringConfig::new("http://scoring.local", "m1"),
        );

        let source = Arc::new(InMemoryMessageSource::default());
        let store = Arc::new(InMemoryResultStore::new());
        let sink = Arc::new(CollectingEventSink::new());

        let controller = Arc::new(
            RelayController::new(
                &config,
                source.clone(),
                Arc::new(MockFetcher::new()),
                Arc::new(MockPredictionClient::new("m1")),
                store.clone(),
            )
            .with_sink(sink.clone()),
        );

        let pool = RelayWorkerPool::new(
            channel,
            WorkerConfig::new().with_concurrency(concurrency),
            source.clone(),
            controller,
        )
        .with_sink(sink.clone());

        (pool, source, store, sink)
    }

    #[tokio::test]
    async fn test_pool_processes_published_events() {
        let (pool, source, store, _sink) = pool_harness(4);
        let token = pool.shutdown_token();

        source.publish("dicom/a");
        source.publish("dicom/b");
        source.publish("dicom/c");

        let runner = tokio::spawn(async move { pool.run().await });

        tokio::time::sleep(Duration::from_millis(100)).await;
        token.shutdown("test done");
        runner.await.unwrap();

        assert_eq!(store.len(), 3);
        assert_eq!(source.in_flight_len(), 0);
    }

    #[tokio::test]
    async fn test_pool_drains_in_flight_on_shutdown() {
        let (pool, source, store, _sink) = pool_harness(2);
        let token = pool.shutdown_token();

        source.publish("dicom/a");

        let runner = tokio::spawn(async move { pool.run().await });

        // Shut down almost immediately; the already-claimed event must
        // still complete before run() returns.
        tokio::time::sleep(Duration::from_millis(30)).await;
        token.shutdown("early stop");
        runner.await.unwrap();

        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_pool_backs_off_when_channel_unavailable() {
        let (pool, source, _store, sink) = pool_harness(2);
        let pool = pool.with_source_backoff(
            RetryConfig::new()
                .with_backoff_base_ms(5)
                .with_jitter(crate::retry::JitterStrategy::None),
        );
        let token = pool.shutdown_token();

        source.set_unavailable(true);

        let runner = tokio::spawn(async move { pool.run().await });

        tokio::time::sleep(Duration::from_millis(60)).await;
        token.shutdown("test done");
        runner.await.unwrap();

        assert!(!sink.events_of_type("relay.channel_unavailable").is_empty());
    }
}
