//! Event sink trait and implementations.

use async_trait::async_trait;
use tracing::{debug, info, Level};

use super::RelayEvent;

/// Trait for sinks that receive relay observability entries.
///
/// Sinks are append-only and must support concurrent append. Emitting must
/// never fail the caller: sink errors are logged and suppressed.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Appends an entry asynchronously.
    async fn emit(&self, event: RelayEvent);

    /// Appends an entry without awaiting. Must not panic.
    fn try_emit(&self, event: RelayEvent);
}

/// A no-op sink that discards all entries.
///
/// Used as the default when no sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: RelayEvent) {
        // Intentionally empty - discards all entries
    }

    fn try_emit(&self, _event: RelayEvent) {
        // Intentionally empty - discards all entries
    }
}

/// A sink that logs entries through the tracing framework.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    /// The log level to use.
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a new logging sink with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    /// Creates an info-level logging sink.
    #[must_use]
    pub fn info() -> Self {
        Self::new(Level::INFO)
    }

    fn log_event(&self, event: &RelayEvent) {
        match self.level {
            Level::DEBUG => {
                debug!(
                    event_type = %event.event_type,
                    event_data = ?event.data,
                    "Event: {}", event.event_type
                );
            }
            _ => {
                info!(
                    event_type = %event.event_type,
                    event_data = ?event.data,
                    "Event: {}", event.event_type
                );
            }
        }
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event: RelayEvent) {
        self.log_event(&event);
    }

    fn try_emit(&self, event: RelayEvent) {
        self.log_event(&event);
    }
}

/// A collecting sink for testing purposes.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: parking_lot::RwLock<Vec<RelayEvent>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected entries.
    #[must_use]
    pub fn events(&self) -> Vec<RelayEvent> {
        self.events.read().clone()
    }

    /// Returns the number of collected entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no entries have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected entries.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Returns entries matching a type prefix.
    #[must_use]
    pub fn events_of_type(&self, type_prefix: &str) -> Vec<RelayEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.event_type.starts_with(type_prefix))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event: RelayEvent) {
        self.events.write().push(event);
    }

    fn try_emit(&self, event: RelayEvent) {
        self.events.write().push(event);
    }
}
