//! HTTP artifact fetcher against the canonical store.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::config::StoreConfig;
use crate::core::Artifact;
use crate::errors::RelayError;

use super::ArtifactFetcher;

/// Fetches artifacts from the canonical store over HTTP.
///
/// Connect failures and 5xx/429 statuses surface as `TransientFetch`; a
/// 404 is `ArtifactNotFound` and permanent.
pub struct HttpArtifactFetcher {
    client: reqwest::Client,
    config: StoreConfig,
}

impl HttpArtifactFetcher {
    /// Creates a fetcher for the configured store.
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

    fn artifact_url(&self, reference: &str) -> String {
        format!(
            "{}/artifacts/{}",
            self.config.endpoint.trim_end_matches('/'),
            reference.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl ArtifactFetcher for HttpArtifactFetcher {
    async fn fetch(&self, reference: &str) -> Result<Artifact, RelayError> {
        let response = self
            .client
            .get(self.artifact_url(reference))
            .send()
            .await
            .map_err(|e| RelayError::transient_fetch(reference, e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RelayError::not_found(reference));
        }
        if !status.is_success() {
            return Err(RelayError::transient_fetch(
                reference,
                format!("store returned status {status}"),
            ));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let mut metadata = HashMap::new();
        for (name, value) in response.headers() {
            if let Some(key) = name.as_str().strip_prefix("x-artifact-") {
                if let Ok(v) = value.to_str() {
                    metadata.insert(key.to_string(), v.to_string());
                }
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| RelayError::transient_fetch(reference, e.to_string()))?;

        let mut artifact = Artifact::new(reference, bytes.to_vec());
        if let Some(ct) = content_type {
            artifact = artifact.with_content_type(ct);
        }
        artifact.metadata = metadata;

        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_url_joins_cleanly() {
        let fetcher = HttpArtifactFetcher::new(StoreConfig::new("http://store.local/")).unwrap();

        assert_eq!(
            fetcher.artifact_url("/studies/1/instances/2"),
            "http://store.local/artifacts/studies/1/instances/2"
        );
        assert_eq!(
            fetcher.artifact_url("dicom/abc"),
            "http://store.local/artifacts/dicom/abc"
        );
    }
}
