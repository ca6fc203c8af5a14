//! Message source adapter.
//!
//! The source delivers one event per newly stored artifact with
//! at-least-once semantics: events stay in the redelivery queue until
//! acknowledged, and an unacknowledged delivery reappears after the
//! channel's visibility timeout.

mod memory;
mod pull;

pub use memory::InMemoryMessageSource;
pub use pull::HttpPullSource;

use async_trait::async_trait;
use std::time::Duration;

use crate::core::{ArtifactEvent, DeliveryToken};
use crate::errors::RelayError;

/// Trait for message sources delivering artifact events.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Receives up to `max` events, waiting at most `wait` when the channel
    /// is idle.
    ///
    /// An idle channel yields an empty batch, never an error. Each call
    /// continues from the last acknowledged position.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::TransientUnavailable`] when the channel is
    /// unreachable; the caller should retry with backoff.
    async fn receive(&self, max: usize, wait: Duration) -> Result<Vec<ArtifactEvent>, RelayError>;

    /// Acknowledges one delivery, removing it from the redelivery queue.
    ///
    /// Idempotent: acknowledging the same token twice has no additional
    /// effect.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::TransientUnavailable`] when the channel is
    /// unreachable.
    async fn acknowledge(&self, token: &DeliveryToken) -> Result<(), RelayError>;
}
