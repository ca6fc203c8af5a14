//! In-memory message source with redelivery.
//!
//! Used by tests and local runs. Models the channel contract faithfully:
//! at-least-once delivery, per-delivery tokens, and redelivery of
//! unacknowledged events after a visibility timeout.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::core::{ArtifactEvent, DeliveryToken};
use crate::errors::RelayError;

use super::MessageSource;

struct InFlight {
    reference: String,
    redeliver_at: Instant,
}

struct SourceState {
    pending: Vec<String>,
    in_flight: HashMap<String, InFlight>,
    unavailable: bool,
}

/// An in-process message source.
pub struct InMemoryMessageSource {
    state: Mutex<SourceState>,
    visibility_timeout: Duration,
}

impl InMemoryMessageSource {
    /// Creates a source with the given visibility timeout for
    /// unacknowledged deliveries.
    #[must_use]
    pub fn new(visibility_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(SourceState {
                pending: Vec::new(),
                in_flight: HashMap::new(),
                unavailable: false,
            }),
            visibility_timeout,
        }
    }

    /// Publishes an event for the given artifact reference.
    pub fn publish(&self, reference: impl Into<String>) {
        self.state.lock().pending.push(reference.into());
    }

    /// Simulates the channel becoming unreachable (or reachable again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unavailable = unavailable;
    }

    /// The number of deliveries awaiting acknowledgment.
    #[must_use]
    pub fn in_flight_len(&self) -> usize {
        self.state.lock().in_flight.len()
    }

    /// The number of events awaiting delivery (after requeuing expired
    /// deliveries).
    #[must_use]
    pub fn pending_len(&self) -> usize {
        let mut state = self.state.lock();
        Self::requeue_expired(&mut state);
        state.pending.len()
    }

    fn requeue_expired(state: &mut SourceState) {
        let now = Instant::now();
        let expired: Vec<String> = state
            .in_flight
            .iter()
            .filter(|(_, f)| f.redeliver_at <= now)
            .map(|(token, _)| token.clone())
            .collect();

        for token in expired {
            if let Some(flight) = state.in_flight.remove(&token) {
                state.pending.push(flight.reference);
            }
        }
    }

    fn take_batch(&self, max: usize) -> Result<Vec<ArtifactEvent>, RelayError> {
        let mut state = self.state.lock();

        if state.unavailable {
            return Err(RelayError::TransientUnavailable(
                "in-memory channel marked unavailable".into(),
            ));
        }

        Self::requeue_expired(&mut state);

        let count = state.pending.len().min(max);
        let mut batch = Vec::with_capacity(count);
        let taken: Vec<String> = state.pending.drain(..count).collect();

        for reference in taken {
            let token = DeliveryToken::new(format!("delivery-{}", uuid::Uuid::new_v4()));
            state.in_flight.insert(
                token.as_str().to_string(),
                InFlight {
                    reference: reference.clone(),
                    redeliver_at: Instant::now() + self.visibility_timeout,
                },
            );
            batch.push(ArtifactEvent::new(reference, token));
        }

        Ok(batch)
    }
}

impl Default for InMemoryMessageSource {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[async_trait]
impl MessageSource for InMemoryMessageSource {
    async fn receive(&self, max: usize, wait: Duration) -> Result<Vec<ArtifactEvent>, RelayError> {
        let deadline = Instant::now() + wait;

        loop {
            let batch = self.take_batch(max)?;
            if !batch.is_empty() {
                return Ok(batch);
            }
            if Instant::now() >= deadline {
                return Ok(Vec::new());
            }
            tokio::time::sleep(Duration::from_millis(10).min(wait)).await;
        }
    }

    async fn acknowledge(&self, token: &DeliveryToken) -> Result<(), RelayError> {
        let mut state = self.state.lock();

        if state.unavailable {
            return Err(RelayError::TransientUnavailable(
                "in-memory channel marked unavailable".into(),
            ));
        }

        // Removing an unknown token is a no-op: acks are idempotent and may
        // race visibility-timeout redelivery.
        state.in_flight.remove(token.as_str());
        Ok(())
    }
}
