//! # Inferelay
//!
//! A notification-driven inference relay.
//!
//! Inferelay subscribes to a messaging channel that announces newly stored
//! artifacts, and drives each announcement through a fixed cycle:
//!
//! - **Fetch**: resolve the event's reference into the binary payload
//! - **Predict**: score the payload against a remote model endpoint
//! - **Package & store**: persist the result under an idempotent key
//! - **Acknowledge**: remove the delivery from the redelivery queue
//!
//! Delivery is at-least-once: failed events are left unacknowledged and
//! the channel redelivers them, while the deterministic store key makes
//! reprocessing overwrite-safe.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use inferelay::prelude::*;
//! use std::sync::Arc;
//!
//! let config = RelayConfig::new(
//!     ChannelConfig::new("http://channel", "new-artifacts"),
//!     StoreConfig::new("http://store"),
//!     ScoringConfig::new("http://scoring", "classifier-v3"),
//! );
//! config.validate()?;
//!
//! let source = Arc::new(HttpPullSource::new(config.channel.clone())?);
//! let controller = Arc::new(RelayController::new(
//!     &config,
//!     source.clone(),
//!     Arc::new(HttpArtifactFetcher::new(config.store.clone())?),
//!     Arc::new(HttpPredictionClient::new(config.scoring.clone())?),
//!     Arc::new(HttpResultStore::new(config.store.clone())?),
//! ));
//!
//! let pool = RelayWorkerPool::new(config.channel, config.worker, source, controller);
//! pool.run().await;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod fetch;
pub mod predict;
pub mod relay;
pub mod retry;
pub mod shutdown;
pub mod source;
pub mod store;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{
        ChannelConfig, RelayConfig, ScoringConfig, StoreConfig, WorkerConfig,
    };
    pub use crate::core::{
        derive_store_key, Artifact, ArtifactEvent, ClassScore, DeliveryToken,
        PredictionResult, RelayOutcome, RelayState, ResultRecord,
    };
    pub use crate::errors::RelayError;
    pub use crate::events::{
        CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, RelayEvent,
    };
    pub use crate::fetch::{ArtifactFetcher, HttpArtifactFetcher};
    pub use crate::predict::{HttpPredictionClient, PredictionClient};
    pub use crate::relay::{RelayController, RelayWorkerPool};
    pub use crate::retry::{BackoffStrategy, JitterStrategy, RetryConfig};
    pub use crate::shutdown::ShutdownToken;
    pub use crate::source::{HttpPullSource, InMemoryMessageSource, MessageSource};
    pub use crate::store::{HttpResultStore, InMemoryResultStore, ResultStore};
}
