//! HTTP prediction client for the scoring endpoint.

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::config::ScoringConfig;
use crate::core::{Artifact, ClassScore, PredictionResult};
use crate::errors::RelayError;

use super::PredictionClient;

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    model: &'a str,
    reference: &'a str,
    /// Base64-encoded artifact payload.
    payload: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_type: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    label: String,
    confidence: f64,
    #[serde(default)]
    scores: Vec<ResponseScore>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseScore {
    label: String,
    score: f64,
}

#[derive(Debug, Deserialize)]
struct PredictErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Scores artifacts against a remote model endpoint over HTTP.
pub struct HttpPredictionClient {
    client: reqwest::Client,
    config: ScoringConfig,
}

impl HttpPredictionClient {
    /// Creates a client for the configured scoring endpoint.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::Config` if the HTTP client cannot be built.
    pub fn new(config: ScoringConfig) -> Result<Self, RelayError> {
        // The reqwest-level timeout is what maps to PredictionTimeout, so
        // it is the single place the prediction deadline lives.
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| RelayError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    fn predict_url(&self) -> String {
        format!(
            "{}/models/{}:predict",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl PredictionClient for HttpPredictionClient {
    async fn predict(&self, artifact: &Artifact) -> Result<PredictionResult, RelayError> {
        let request = PredictRequest {
            model: &self.config.model,
            reference: &artifact.reference,
            payload: base64::engine::general_purpose::STANDARD.encode(&artifact.bytes),
            content_type: artifact.content_type.as_deref(),
        };

        let response = self
            .client
            .post(self.predict_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RelayError::PredictionTimeout {
                        reference: artifact.reference.clone(),
                        timeout_ms: self.config.timeout_ms,
                    }
                } else {
                    RelayError::prediction_service("unreachable", e.to_string())
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let body: PredictErrorBody = response.json().await.unwrap_or(PredictErrorBody {
                code: None,
                message: None,
            });
            return Err(RelayError::prediction_service(
                body.code.unwrap_or_else(|| status.as_u16().to_string()),
                body.message
                    .unwrap_or_else(|| "scoring endpoint rejected the request".into()),
            ));
        }

        let body: PredictResponse = response.json().await.map_err(|e| {
            RelayError::Serialization(format!("malformed prediction response: {e}"))
        })?;

        let mut result = PredictionResult::new(
            &artifact.reference,
            body.label,
            body.confidence,
            body.model.unwrap_or_else(|| self.config.model.clone()),
        );
        if !body.scores.is_empty() {
            result = result.with_scores(
                body.scores
                    .into_iter()
                    .map(|s| ClassScore {
                        label: s.label,
                        score: s.score,
                    })
                    .collect(),
            );
        }

        Ok(result)
    }
}
