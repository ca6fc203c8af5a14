//! Event type for newly stored artifacts.

use serde::{Deserialize, Serialize};

/// Opaque token used to acknowledge one delivery of an event.
///
/// The channel mints a fresh token per delivery; acknowledging with it
/// removes that delivery from the redelivery queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeliveryToken(String);

impl DeliveryToken {
    /// Creates a token from its wire form.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The wire form of the token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DeliveryToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Notification of one newly stored artifact.
///
/// Delivered at-least-once: the same artifact reference may arrive again
/// under a different delivery token if a prior delivery was never
/// acknowledged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactEvent {
    /// Store path/identifier of the artifact.
    pub reference: String,

    /// When the event arrived, RFC3339.
    pub arrived_at: String,

    /// Token for acknowledging this delivery.
    pub token: DeliveryToken,
}

impl ArtifactEvent {
    /// Creates an event for the given reference and delivery token.
    #[must_use]
    pub fn new(reference: impl Into<String>, token: DeliveryToken) -> Self {
        Self {
            reference: reference.into(),
            arrived_at: chrono::Utc::now().to_rfc3339(),
            token,
        }
    }

    /// Creates an event with an explicit arrival timestamp.
    #[must_use]
    pub fn with_arrival(
        reference: impl Into<String>,
        token: DeliveryToken,
        arrived_at: impl Into<String>,
    ) -> Self {
        Self {
            reference: reference.into(),
            arrived_at: arrived_at.into(),
            token,
        }
    }
}
