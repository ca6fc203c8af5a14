//! Error types for the inferelay relay.
//!
//! The taxonomy distinguishes transient conditions, which are retried with
//! bounded backoff, from permanent conditions, which terminate an event's
//! processing and leave it unacknowledged for redelivery.

use std::collections::HashMap;
use thiserror::Error;

/// The main error type for relay operations.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The message channel is unreachable.
    #[error("Message channel unavailable: {0}")]
    TransientUnavailable(String),

    /// A retryable network condition occurred while fetching an artifact.
    #[error("Transient fetch error for '{reference}': {detail}")]
    TransientFetch {
        /// The artifact reference being fetched.
        reference: String,
        /// Description of the underlying condition.
        detail: String,
    },

    /// The artifact reference did not resolve.
    #[error("Artifact not found: {reference}")]
    ArtifactNotFound {
        /// The unresolvable artifact reference.
        reference: String,
    },

    /// No response arrived from the scoring endpoint within the timeout.
    #[error("Prediction timed out after {timeout_ms}ms for '{reference}'")]
    PredictionTimeout {
        /// The artifact reference being scored.
        reference: String,
        /// The configured timeout in milliseconds.
        timeout_ms: u64,
    },

    /// The scoring endpoint rejected the request.
    #[error("Prediction service error {code}: {message}")]
    PredictionService {
        /// Error code reported by the endpoint.
        code: String,
        /// Error message reported by the endpoint.
        message: String,
    },

    /// The canonical store declined the result write.
    #[error("Store rejected record '{key}': {detail}")]
    StoreRejected {
        /// The store key of the rejected record.
        key: String,
        /// Description of the rejection.
        detail: String,
    },

    /// The per-event processing deadline elapsed.
    #[error("Event deadline exceeded after {deadline_ms}ms for '{reference}'")]
    DeadlineExceeded {
        /// The artifact reference being processed.
        reference: String,
        /// The configured deadline in milliseconds.
        deadline_ms: u64,
    },

    /// Startup configuration was invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An HTTP transport error not yet normalised into one of the kinds above.
    #[error("HTTP error: {0}")]
    Http(String),
}

impl RelayError {
    /// Creates a transient fetch error.
    #[must_use]
    pub fn transient_fetch(reference: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::TransientFetch {
            reference: reference.into(),
            detail: detail.into(),
        }
    }

    /// Creates an artifact-not-found error.
    #[must_use]
    pub fn not_found(reference: impl Into<String>) -> Self {
        Self::ArtifactNotFound {
            reference: reference.into(),
        }
    }

    /// Creates a prediction service error.
    #[must_use]
    pub fn prediction_service(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PredictionService {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Creates a store-rejected error.
    #[must_use]
    pub fn store_rejected(key: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::StoreRejected {
            key: key.into(),
            detail: detail.into(),
        }
    }

    /// Returns true if the error is a transient condition worth retrying.
    ///
    /// Prediction timeouts are retryable but only up to the controller's
    /// bound; everything else retryable here is retried where it occurs.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TransientUnavailable(_)
                | Self::TransientFetch { .. }
                | Self::PredictionTimeout { .. }
        )
    }

    /// Returns the short kind tag used in sink payloads and logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TransientUnavailable(_) => "transient_unavailable",
            Self::TransientFetch { .. } => "transient_fetch",
            Self::ArtifactNotFound { .. } => "artifact_not_found",
            Self::PredictionTimeout { .. } => "prediction_timeout",
            Self::PredictionService { .. } => "prediction_service",
            Self::StoreRejected { .. } => "store_rejected",
            Self::DeadlineExceeded { .. } => "deadline_exceeded",
            Self::Config(_) => "config",
            Self::Serialization(_) => "serialization",
            Self::Http(_) => "http",
        }
    }

    /// Converts to a dictionary representation for sink payloads.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("kind".to_string(), serde_json::json!(self.kind()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));

        match self {
            Self::TransientFetch { reference, .. }
            | Self::ArtifactNotFound { reference }
            | Self::PredictionTimeout { reference, .. }
            | Self::DeadlineExceeded { reference, .. } => {
                map.insert("reference".to_string(), serde_json::json!(reference));
            }
            Self::PredictionService { code, .. } => {
                map.insert("code".to_string(), serde_json::json!(code));
            }
            Self::StoreRejected { key, .. } => {
                map.insert("key".to_string(), serde_json::json!(key));
            }
            _ => {}
        }

        map
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
