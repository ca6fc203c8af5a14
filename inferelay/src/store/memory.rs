//! In-memory result store.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::core::ResultRecord;
use crate::errors::RelayError;

use super::ResultStore;

/// A concurrent in-memory result store with keyed overwrite semantics.
///
/// Used by tests and local runs.
#[derive(Debug, Default)]
pub struct InMemoryResultStore {
    records: DashMap<String, ResultRecord>,
}

impl InMemoryResultStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the record stored under a key, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<ResultRecord> {
        self.records.get(key).map(|r| r.clone())
    }

    /// Returns the number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl ResultStore for InMemoryResultStore {
    async fn store(&self, record: &ResultRecord) -> Result<(), RelayError> {
        if record.label.trim().is_empty() {
            return Err(RelayError::store_rejected(
                &record.key,
                "record has an empty label",
            ));
        }

        self.records.insert(record.key.clone(), record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{derive_store_key, PredictionResult};

    fn record_for(reference: &str, label: &str, confidence: f64) -> ResultRecord {
        ResultRecord::package(&PredictionResult::new(reference, label, confidence, "m1"))
    }

    #[tokio::test]
    async fn test_store_and_get() {
        let store = InMemoryResultStore::new();
        let record = record_for("dicom/abc", "normal", 0.9);

        store.store(&record).await.unwrap();

        let stored = store.get(&derive_store_key("dicom/abc")).unwrap();
        assert_eq!(stored.label, "normal");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_replay_overwrites_not_duplicates() {
        let store = InMemoryResultStore::new();

        store.store(&record_for("dicom/abc", "normal", 0.7)).await.unwrap();
        store.store(&record_for("dicom/abc", "pneumonia", 0.95)).await.unwrap();

        assert_eq!(store.len(), 1);
        let stored = store.get(&derive_store_key("dicom/abc")).unwrap();
        assert_eq!(stored.label, "pneumonia");
    }

    #[tokio::test]
    async fn test_malformed_record_rejected() {
        let store = InMemoryResultStore::new();
        let record = record_for("dicom/abc", " ", 0.5);

        let err = store.store(&record).await.unwrap_err();
        assert_eq!(err.kind(), "store_rejected");
        assert!(store.is_empty());
    }
}
