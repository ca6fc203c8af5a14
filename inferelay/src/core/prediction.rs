//! Prediction result type.

use serde::{Deserialize, Serialize};

/// One class in a score distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassScore {
    /// Class label.
    pub label: String,
    /// Score for this class.
    pub score: f64,
}

/// Structured output from the scoring endpoint for one artifact.
///
/// Created by the prediction client, consumed by the result packager, and
/// dropped after packaging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Store reference of the artifact this prediction is for.
    pub reference: String,

    /// Winning class label.
    pub label: String,

    /// Confidence in the winning label.
    pub confidence: f64,

    /// Full score distribution, if the endpoint returned one.
    #[serde(default)]
    pub scores: Vec<ClassScore>,

    /// Model/version identifier that produced this result.
    pub model: String,
}

impl PredictionResult {
    /// Creates a prediction result.
    #[must_use]
    pub fn new(
        reference: impl Into<String>,
        label: impl Into<String>,
        confidence: f64,
        model: impl Into<String>,
    ) -> Self {
        Self {
            reference: reference.into(),
            label: label.into(),
            confidence,
            scores: Vec::new(),
            model: model.into(),
        }
    }

    /// Sets the full score distribution.
    #[must_use]
    pub fn with_scores(mut self, scores: Vec<ClassScore>) -> Self {
        self.scores = scores;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prediction_creation() {
        let result = PredictionResult::new("dicom/abc", "pneumonia", 0.92, "classifier-v3")
            .with_scores(vec![
                ClassScore { label: "pneumonia".into(), score: 0.92 },
                ClassScore { label: "normal".into(), score: 0.08 },
            ]);

        assert_eq!(result.label, "pneumonia");
        assert_eq!(result.scores.len(), 2);
        assert_eq!(result.model, "classifier-v3");
    }

    #[test]
    fn test_prediction_serialization() {
        let result = PredictionResult::new("dicom/abc", "normal", 0.7, "m1");
        let json = serde_json::to_string(&result).unwrap();
        let back: PredictionResult = serde_json::from_str(&json).unwrap();

        assert_eq!(back.reference, "dicom/abc");
        assert_eq!(back.label, "normal");
        assert!(back.scores.is_empty());
    }
}
