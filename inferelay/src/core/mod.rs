//! Core domain types for the relay.
//!
//! These types flow through one processing cycle: an [`ArtifactEvent`]
//! arrives from the channel, resolves to an [`Artifact`], is scored into a
//! [`PredictionResult`], and is persisted as a [`ResultRecord`].

mod artifact;
mod event;
mod prediction;
mod record;
mod state;

pub use artifact::Artifact;
pub use event::{ArtifactEvent, DeliveryToken};
pub use prediction::{ClassScore, PredictionResult};
pub use record::{derive_store_key, ResultRecord, RESULT_RELATION};
pub use state::{RelayOutcome, RelayState};
