//! Artifact fetcher.
//!
//! Resolves an event's reference into the binary payload it names. A
//! fetcher performs a single attempt; the controller applies the
//! configured retry/backoff policy around it.

mod http;

pub use http::HttpArtifactFetcher;

use async_trait::async_trait;

use crate::core::Artifact;
use crate::errors::RelayError;

/// Trait for resolving artifact references into payloads.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    /// Fetches the artifact the reference names.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::ArtifactNotFound`] when the reference does not
    /// resolve (permanent, never retried) and [`RelayError::TransientFetch`]
    /// for retryable network conditions.
    async fn fetch(&self, reference: &str) -> Result<Artifact, RelayError>;
}
