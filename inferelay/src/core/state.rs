//! Relay state machine and per-event outcome.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::RelayError;

/// Processing state of one in-flight event.
///
/// States progress `Received → Fetching → Predicting → Packaging → Storing
/// → Acknowledged`; `Failed` is terminal and reachable from any
/// non-terminal state on a non-retryable error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayState {
    /// Event received from the channel.
    Received,
    /// Resolving the artifact reference.
    Fetching,
    /// Waiting on the scoring endpoint.
    Predicting,
    /// Converting the prediction into a record.
    Packaging,
    /// Writing the record to the canonical store.
    Storing,
    /// Record stored and delivery acknowledged.
    Acknowledged,
    /// Processing terminated on a non-retryable error.
    Failed,
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Received => write!(f, "received"),
            Self::Fetching => write!(f, "fetching"),
            Self::Predicting => write!(f, "predicting"),
            Self::Packaging => write!(f, "packaging"),
            Self::Storing => write!(f, "storing"),
            Self::Acknowledged => write!(f, "acknowledged"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl RelayState {
    /// Returns true if the state is terminal.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Acknowledged | Self::Failed)
    }
}

/// Terminal outcome of processing one event delivery.
#[derive(Debug)]
pub struct RelayOutcome {
    /// Artifact reference of the processed event.
    pub reference: String,
    /// Terminal state reached.
    pub state: RelayState,
    /// The stage the event was in when it failed, if it failed.
    pub failed_at: Option<RelayState>,
    /// The error that terminated processing, if it failed.
    pub error: Option<RelayError>,
    /// Fetch attempts performed.
    pub fetch_attempts: usize,
    /// Prediction attempts performed.
    pub predict_attempts: usize,
    /// Wall-clock processing time in milliseconds.
    pub duration_ms: f64,
}

impl RelayOutcome {
    /// Creates an acknowledged outcome.
    #[must_use]
    pub fn acknowledged(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            state: RelayState::Acknowledged,
            failed_at: None,
            error: None,
            fetch_attempts: 0,
            predict_attempts: 0,
            duration_ms: 0.0,
        }
    }

    /// Creates a failed outcome with the stage it failed in and the cause.
    #[must_use]
    pub fn failed(reference: impl Into<String>, stage: RelayState, error: RelayError) -> Self {
        Self {
            reference: reference.into(),
            state: RelayState::Failed,
            failed_at: Some(stage),
            error: Some(error),
            fetch_attempts: 0,
            predict_attempts: 0,
            duration_ms: 0.0,
        }
    }

    /// Sets the attempt counters.
    #[must_use]
    pub fn with_attempts(mut self, fetch: usize, predict: usize) -> Self {
        self.fetch_attempts = fetch;
        self.predict_attempts = predict;
        self
    }

    /// Sets the processing duration.
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Returns true if the event was acknowledged.
    #[must_use]
    pub fn is_acknowledged(&self) -> bool {
        self.state == RelayState::Acknowledged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(RelayState::Acknowledged.is_terminal());
        assert!(RelayState::Failed.is_terminal());
        assert!(!RelayState::Received.is_terminal());
        assert!(!RelayState::Storing.is_terminal());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(RelayState::Predicting.to_string(), "predicting");
        assert_eq!(RelayState::Acknowledged.to_string(), "acknowledged");
    }

    #[test]
    fn test_acknowledged_outcome() {
        let outcome = RelayOutcome::acknowledged("dicom/abc")
            .with_attempts(1, 1)
            .with_duration_ms(12.5);

        assert!(outcome.is_acknowledged());
        assert!(outcome.error.is_none());
        assert_eq!(outcome.fetch_attempts, 1);
    }

    #[test]
    fn test_failed_outcome_records_stage_and_cause() {
        let outcome = RelayOutcome::failed(
            "dicom/abc",
            RelayState::Fetching,
            RelayError::not_found("dicom/abc"),
        );

        assert!(!outcome.is_acknowledged());
        assert_eq!(outcome.failed_at, Some(RelayState::Fetching));
        assert_eq!(outcome.error.as_ref().map(RelayError::kind), Some("artifact_not_found"));
    }
}
