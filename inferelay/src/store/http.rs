//! HTTP result store against the canonical store.

use async_trait::async_trait;

use crate::config::StoreConfig;
use crate::core::ResultRecord;
use crate::errors::RelayError;

use super::ResultStore;

/// Persists result records to the canonical store over HTTP.
///
/// Records are written with PUT under their deterministic key, so the
/// write is idempotent: replaying an event overwrites the prior record.
pub struct HttpResultStore {
    client: reqwest::Client,
    config: StoreConfig,
}

impl HttpResultStore {
    /// Creates a store client for the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::Config` if the HTTP client cannot be built.
    pub fn new(config: StoreConfig) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| RelayError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    fn record_url(&self, key: &str) -> String {
        format!(
            "{}/results/{}",
            self.config.endpoint.trim_end_matches('/'),
            key
        )
    }
}

#[async_trait]
impl ResultStore for HttpResultStore {
    async fn store(&self, record: &ResultRecord) -> Result<(), RelayError> {
        let response = self
            .client
            .put(self.record_url(&record.key))
            .json(record)
            .send()
            .await
            .map_err(|e| RelayError::store_rejected(&record.key, e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let detail = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("no response body"));

        Err(RelayError::store_rejected(
            &record.key,
            format!("store returned status {status}: {detail}"),
        ))
    }
}
