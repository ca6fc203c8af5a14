//! Observability events and sinks.
//!
//! Every lifecycle point of an event's processing is reported to an
//! [`EventSink`]; no terminal condition goes unrecorded.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

use std::collections::HashMap;

use crate::core::{RelayOutcome, RelayState};

/// A structured observability entry emitted by the relay.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RelayEvent {
    /// The entry type (e.g., "relay.acknowledged").
    #[serde(rename = "type")]
    pub event_type: String,

    /// When the entry was emitted, RFC3339.
    pub timestamp: String,

    /// The entry payload.
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,
}

impl RelayEvent {
    /// Creates a new entry.
    #[must_use]
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            data: HashMap::new(),
        }
    }

    /// Adds a payload field.
    #[must_use]
    pub fn add_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Entry for an event received from the channel.
    #[must_use]
    pub fn received(reference: &str) -> Self {
        Self::new("relay.received").add_data("reference", serde_json::json!(reference))
    }

    /// Entry for a stored-and-acknowledged event.
    #[must_use]
    pub fn acknowledged(outcome: &RelayOutcome) -> Self {
        Self::new("relay.acknowledged")
            .add_data("reference", serde_json::json!(outcome.reference))
            .add_data("fetch_attempts", serde_json::json!(outcome.fetch_attempts))
            .add_data("predict_attempts", serde_json::json!(outcome.predict_attempts))
            .add_data("duration_ms", serde_json::json!(outcome.duration_ms))
    }

    /// Entry for a terminally failed event, with full context.
    #[must_use]
    pub fn failed(outcome: &RelayOutcome) -> Self {
        let mut event = Self::new("relay.failed")
            .add_data("reference", serde_json::json!(outcome.reference))
            .add_data(
                "stage",
                serde_json::json!(outcome.failed_at.unwrap_or(RelayState::Failed).to_string()),
            )
            .add_data("duration_ms", serde_json::json!(outcome.duration_ms));

        if let Some(ref error) = outcome.error {
            event = event.add_data("error", serde_json::json!(error.to_dict()));
        }

        event
    }

    /// Entry for a retried step within an event's processing.
    #[must_use]
    pub fn retried(reference: &str, stage: RelayState, attempt: usize) -> Self {
        Self::new("relay.retried")
            .add_data("reference", serde_json::json!(reference))
            .add_data("stage", serde_json::json!(stage.to_string()))
            .add_data("attempt", serde_json::json!(attempt))
    }

    /// Entry for a channel that is temporarily unreachable.
    #[must_use]
    pub fn channel_unavailable(detail: &str) -> Self {
        Self::new("relay.channel_unavailable").add_data("detail", serde_json::json!(detail))
    }
}
