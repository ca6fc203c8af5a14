//! Result packaging and storage.
//!
//! Writes are keyed by the deterministic store key, so replaying an event
//! overwrites the prior record for its artifact instead of duplicating it.

mod http;
mod memory;

pub use http::HttpResultStore;
pub use memory::InMemoryResultStore;

use async_trait::async_trait;

use crate::core::ResultRecord;
use crate::errors::RelayError;

/// Trait for the canonical store's result-record surface.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Persists a record, overwriting any prior record under the same key.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::StoreRejected`] when the store declines the
    /// write; this is surfaced, not retried.
    async fn store(&self, record: &ResultRecord) -> Result<(), RelayError>;
}
