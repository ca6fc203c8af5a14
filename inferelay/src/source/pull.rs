//! HTTP pull-subscription source.
//!
//! Speaks a JSON pull/acknowledge protocol against the messaging channel:
//! the relay polls for batches and the channel redelivers unacknowledged
//! messages after its visibility timeout.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ChannelConfig;
use crate::core::{ArtifactEvent, DeliveryToken};
use crate::errors::RelayError;

use super::MessageSource;

#[derive(Debug, Serialize)]
struct PullRequest {
    max_messages: usize,
    wait_ms: u64,
}

#[derive(Debug, Deserialize)]
struct PulledMessage {
    ack_token: String,
    reference: String,
    #[serde(default)]
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PullResponse {
    #[serde(default)]
    messages: Vec<PulledMessage>,
}

#[derive(Debug, Serialize)]
struct AcknowledgeRequest<'a> {
    ack_tokens: Vec<&'a str>,
}

/// A message source backed by an HTTP pull subscription.
pub struct HttpPullSource {
    client: reqwest::Client,
    config: ChannelConfig,
}

impl HttpPullSource {
    /// Creates a pull source for the configured channel.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::Config` if the HTTP client cannot be built.
    pub fn new(config: ChannelConfig) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            // Pull requests long-poll for poll_wait; leave headroom on top.
            .timeout(config.poll_wait() + Duration::from_secs(10))
            .build()
            .map_err(|e| RelayError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    fn pull_url(&self) -> String {
        format!(
            "{}/subscriptions/{}:pull",
            self.config.endpoint.trim_end_matches('/'),
            self.config.subscription
        )
    }

    fn acknowledge_url(&self) -> String {
        format!(
            "{}/subscriptions/{}:acknowledge",
            self.config.endpoint.trim_end_matches('/'),
            self.config.subscription
        )
    }

    fn unavailable(context: &str, err: &reqwest::Error) -> RelayError {
        RelayError::TransientUnavailable(format!("{context}: {err}"))
    }
}

#[async_trait]
impl MessageSource for HttpPullSource {
    async fn receive(&self, max: usize, wait: Duration) -> Result<Vec<ArtifactEvent>, RelayError> {
        let request = PullRequest {
            max_messages: max,
            wait_ms: wait.as_millis() as u64,
        };

        let response = self
            .client
            .post(self.pull_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| Self::unavailable("pull request failed", &e))?;

        if !response.status().is_success() {
            return Err(RelayError::TransientUnavailable(format!(
                "pull returned status {}",
                response.status()
            )));
        }

        let pulled: PullResponse = response
            .json()
            .await
            .map_err(|e| RelayError::Serialization(format!("malformed pull response: {e}")))?;

        let events = pulled
            .messages
            .into_iter()
            .map(|m| {
                let token = DeliveryToken::new(m.ack_token);
                match m.published_at {
                    Some(ts) => ArtifactEvent::with_arrival(m.reference, token, ts),
                    None => ArtifactEvent::new(m.reference, token),
                }
            })
            .collect();

        Ok(events)
    }

    async fn acknowledge(&self, token: &DeliveryToken) -> Result<(), RelayError> {
        let request = AcknowledgeRequest {
            ack_tokens: vec![token.as_str()],
        };

        let response = self
            .client
            .post(self.acknowledge_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| Self::unavailable("acknowledge request failed", &e))?;

        // An expired or already-acknowledged token is not an error: the
        // channel treats acks as idempotent and so do we.
        if response.status().is_success() || response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }

        Err(RelayError::TransientUnavailable(format!(
            "acknowledge returned status {}",
            response.status()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_from_config() {
        let config = ChannelConfig::new("http://channel.local/", "new-artifacts");
        let source = HttpPullSource::new(config).unwrap();

        assert_eq!(
            source.pull_url(),
            "http://channel.local/subscriptions/new-artifacts:pull"
        );
        assert_eq!(
            source.acknowledge_url(),
            "http://channel.local/subscriptions/new-artifacts:acknowledge"
        );
    }

    #[test]
    fn test_pull_response_deserialization() {
        let json = r#"{
            "messages": [
                {"ack_token": "t1", "reference": "dicom/a", "published_at": "2024-01-01T00:00:00Z"},
                {"ack_token": "t2", "reference": "dicom/b"}
            ]
        }"#;

        let response: PullResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.messages.len(), 2);
        assert_eq!(response.messages[0].reference, "dicom/a");
        assert!(response.messages[1].published_at.is_none());
    }

    #[test]
    fn test_empty_pull_response() {
        let response: PullResponse = serde_json::from_str("{}").unwrap();
        assert!(response.messages.is_empty());
    }
}
