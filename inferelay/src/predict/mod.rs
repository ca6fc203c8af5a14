//! Prediction client.
//!
//! Sends an artifact payload to the scoring endpoint and returns the
//! structured result.

mod http;

pub use http::HttpPredictionClient;

use async_trait::async_trait;

use crate::core::{Artifact, PredictionResult};
use crate::errors::RelayError;

/// Trait for scoring clients.
#[async_trait]
pub trait PredictionClient: Send + Sync {
    /// Scores an artifact with the configured model.
    ///
    /// One synchronous request/response with a bounded timeout; the
    /// controller retries timeouts up to its bound.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::PredictionTimeout`] when no response arrives
    /// in time (retryable) and [`RelayError::PredictionService`] when the
    /// endpoint rejects the input (permanent).
    async fn predict(&self, artifact: &Artifact) -> Result<PredictionResult, RelayError>;
}
