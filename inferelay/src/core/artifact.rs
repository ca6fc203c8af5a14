//! Artifact payload type.

use std::collections::HashMap;

/// A binary artifact fetched from the canonical store.
///
/// Immutable once fetched; owned by the controller for the duration of one
/// processing cycle and dropped afterwards.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// The store reference this artifact was fetched from.
    pub reference: String,

    /// The binary payload.
    pub bytes: Vec<u8>,

    /// MIME type reported by the store, if any.
    pub content_type: Option<String>,

    /// Store-reported metadata (study/series grouping and the like).
    pub metadata: HashMap<String, String>,
}

impl Artifact {
    /// Creates an artifact from its reference and payload.
    #[must_use]
    pub fn new(reference: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            reference: reference.into(),
            bytes,
            content_type: None,
            metadata: HashMap::new(),
        }
    }

    /// Sets the content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The payload size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
