//! Persisted result record and its deterministic store key.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use super::prediction::PredictionResult;

/// Fixed relation type linking a result record to its artifact.
pub const RESULT_RELATION: &str = "prediction";

/// Derives the idempotent store key for an artifact reference.
///
/// The key is deterministic over the reference plus the fixed relation
/// type, so reprocessing the same artifact after a crash or redelivery
/// overwrites the prior record instead of duplicating it.
#[must_use]
pub fn derive_store_key(reference: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(reference.as_bytes());
    hasher.update(b":");
    hasher.update(RESULT_RELATION.as_bytes());
    let digest = hasher.finalize();
    format!("result:{}", hex::encode(&digest[..16]))
}

/// The persisted form of a prediction result.
///
/// Exactly one record exists per artifact reference; the store key makes
/// writes overwrite-safe under replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRecord {
    /// Deterministic store key.
    pub key: String,

    /// Store reference of the originating artifact.
    pub reference: String,

    /// Relation of this record to the artifact.
    pub relation: String,

    /// Winning class label.
    pub label: String,

    /// Confidence in the winning label.
    pub confidence: f64,

    /// Full score distribution as label → score.
    #[serde(default)]
    pub scores: HashMap<String, f64>,

    /// Model/version identifier that produced the prediction.
    pub model: String,

    /// When the record was packaged, RFC3339.
    pub created_at: String,
}

impl ResultRecord {
    /// Packages a prediction result into its persisted form.
    #[must_use]
    pub fn package(result: &PredictionResult) -> Self {
        Self {
            key: derive_store_key(&result.reference),
            reference: result.reference.clone(),
            relation: RESULT_RELATION.to_string(),
            label: result.label.clone(),
            confidence: result.confidence,
            scores: result
                .scores
                .iter()
                .map(|s| (s.label.clone(), s.score))
                .collect(),
            model: result.model.clone(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
