//! Mock collaborators that record calls and return scripted results.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

use crate::core::{Artifact, PredictionResult, ResultRecord};
use crate::errors::RelayError;
use crate::fetch::ArtifactFetcher;
use crate::predict::PredictionClient;
use crate::store::ResultStore;

type ErrorFactory = Box<dyn Fn() -> RelayError + Send + Sync>;

enum FailureScript {
    /// Never fail.
    None,
    /// Fail the first `remaining` calls.
    Times { remaining: usize, factory: ErrorFactory },
    /// Fail every call.
    Always(ErrorFactory),
}

impl FailureScript {
    fn next_error(&mut self) -> Option<RelayError> {
        match self {
            Self::None => None,
            Self::Times { remaining, factory } => {
                if *remaining == 0 {
                    None
                } else {
                    *remaining -= 1;
                    Some(factory())
                }
            }
            Self::Always(factory) => Some(factory()),
        }
    }
}

/// A fetcher that returns a fixed payload, with scripted failures.
pub struct MockFetcher {
    payload: Mutex<Vec<u8>>,
    script: Mutex<FailureScript>,
    reference_failures: Mutex<HashMap<String, ErrorFactory>>,
    delay: Mutex<Option<Duration>>,
    calls: Mutex<usize>,
}

impl MockFetcher {
    /// Creates a fetcher that always succeeds with a small payload.
    #[must_use]
    pub fn new() -> Self {
        Self {
            payload: Mutex::new(vec![0u8; 16]),
            script: Mutex::new(FailureScript::None),
            reference_failures: Mutex::new(HashMap::new()),
            delay: Mutex::new(None),
            calls: Mutex::new(0),
        }
    }

    /// Sets the payload returned on success.
    pub fn set_payload(&self, payload: Vec<u8>) {
        *self.payload.lock() = payload;
    }

    /// Fails the next `times` calls with errors from the factory.
    pub fn fail_times<F>(&self, times: usize, factory: F)
    where
        F: Fn() -> RelayError + Send + Sync + 'static,
    {
        *self.script.lock() = FailureScript::Times {
            remaining: times,
            factory: Box::new(factory),
        };
    }

    /// Fails every call with errors from the factory.
    pub fn always_fail<F>(&self, factory: F)
    where
        F: Fn() -> RelayError + Send + Sync + 'static,
    {
        *self.script.lock() = FailureScript::Always(Box::new(factory));
    }

    /// Fails every call for one specific reference; other references are
    /// unaffected.
    pub fn fail_reference<F>(&self, reference: impl Into<String>, factory: F)
    where
        F: Fn() -> RelayError + Send + Sync + 'static,
    {
        self.reference_failures
            .lock()
            .insert(reference.into(), Box::new(factory));
    }

    /// Delays every call by the given duration.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// Returns the number of fetch calls made.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.calls.lock()
    }
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArtifactFetcher for MockFetcher {
    async fn fetch(&self, reference: &str) -> Result<Artifact, RelayError> {
        *self.calls.lock() += 1;

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(factory) = self.reference_failures.lock().get(reference) {
            return Err(factory());
        }

        if let Some(error) = self.script.lock().next_error() {
            return Err(error);
        }

        Ok(Artifact::new(reference, self.payload.lock().clone())
            .with_content_type("application/octet-stream"))
    }
}

/// A prediction client that returns a fixed label, with scripted failures.
pub struct MockPredictionClient {
    model: String,
    label: Mutex<String>,
    confidence: Mutex<f64>,
    script: Mutex<FailureScript>,
    calls: Mutex<usize>,
}

impl MockPredictionClient {
    /// Creates a client that always predicts "normal" at 0.9 confidence.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            label: Mutex::new("normal".to_string()),
            confidence: Mutex::new(0.9),
            script: Mutex::new(FailureScript::None),
            calls: Mutex::new(0),
        }
    }

    /// Sets the label returned on success.
    pub fn set_label(&self, label: impl Into<String>) {
        *self.label.lock() = label.into();
    }

    /// Sets the confidence returned on success.
    pub fn set_confidence(&self, confidence: f64) {
        *self.confidence.lock() = confidence;
    }

    /// Fails the next `times` calls with errors from the factory.
    pub fn fail_times<F>(&self, times: usize, factory: F)
    where
        F: Fn() -> RelayError + Send + Sync + 'static,
    {
        *self.script.lock() = FailureScript::Times {
            remaining: times,
            factory: Box::new(factory),
        };
    }

    /// Fails every call with errors from the factory.
    pub fn always_fail<F>(&self, factory: F)
    where
        F: Fn() -> RelayError + Send + Sync + 'static,
    {
        *self.script.lock() = FailureScript::Always(Box::new(factory));
    }

    /// Returns the number of predict calls made.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.calls.lock()
    }
}

#[async_trait]
impl PredictionClient for MockPredictionClient {
    async fn predict(&self, artifact: &Artifact) -> Result<PredictionResult, RelayError> {
        *self.calls.lock() += 1;

        if let Some(error) = self.script.lock().next_error() {
            return Err(error);
        }

        Ok(PredictionResult::new(
            &artifact.reference,
            self.label.lock().clone(),
            *self.confidence.lock(),
            &self.model,
        ))
    }
}

/// A result store that records writes, with scripted failures.
pub struct MockResultStore {
    records: Mutex<Vec<ResultRecord>>,
    script: Mutex<FailureScript>,
}

impl MockResultStore {
    /// Creates a store that accepts every write.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            script: Mutex::new(FailureScript::None),
        }
    }

    /// Fails the next `times` writes with errors from the factory.
    pub fn fail_times<F>(&self, times: usize, factory: F)
    where
        F: Fn() -> RelayError + Send + Sync + 'static,
    {
        *self.script.lock() = FailureScript::Times {
            remaining: times,
            factory: Box::new(factory),
        };
    }

    /// Fails every write with errors from the factory.
    pub fn always_fail<F>(&self, factory: F)
    where
        F: Fn() -> RelayError + Send + Sync + 'static,
    {
        *self.script.lock() = FailureScript::Always(Box::new(factory));
    }

    /// Returns all records written, in order.
    #[must_use]
    pub fn records(&self) -> Vec<ResultRecord> {
        self.records.lock().clone()
    }
}

impl Default for MockResultStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResultStore for MockResultStore {
    async fn store(&self, record: &ResultRecord) -> Result<(), RelayError> {
        if let Some(error) = self.script.lock().next_error() {
            return Err(error);
        }

        self.records.lock().push(record.clone());
        Ok(())
    }
}
