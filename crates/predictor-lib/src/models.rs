//! Core data models for the risk predictor

use serde::{Deserialize, Serialize};
use std::fmt;

/// Validated model input, positionally aligned with its feature names
///
/// Only built through [`crate::predictor::FeatureSchema::build`], so every
/// instance has the schema's arity and finite values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    names: Vec<String>,
    values: Vec<f32>,
}

impl FeatureVector {
    pub(crate) fn new(names: Vec<String>, values: Vec<f32>) -> Self {
        debug_assert_eq!(names.len(), values.len());
        Self { names, values }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f32> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i])
    }
}

/// Call convention of a model backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Class-probability interface; the positive class is reported
    ProbabilisticClassifier,
    /// Scalar output used as an unbounded severity score
    RawScoreRegressor,
    /// Discrete class index mapped through a label table
    RawScoreClassifier,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProbabilisticClassifier => "probabilistic_classifier",
            Self::RawScoreRegressor => "raw_score_regressor",
            Self::RawScoreClassifier => "raw_score_classifier",
        }
    }

    /// Kind of score an adapter of this backend kind produces
    pub fn score_kind(&self) -> ScoreKind {
        match self {
            Self::ProbabilisticClassifier => ScoreKind::Probability,
            Self::RawScoreRegressor => ScoreKind::Regression,
            Self::RawScoreClassifier => ScoreKind::ClassIndex,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreKind {
    Probability,
    Regression,
    ClassIndex,
}

impl ScoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Probability => "probability",
            Self::Regression => "regression",
            Self::ClassIndex => "class_index",
        }
    }
}

/// Normalized model output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub kind: ScoreKind,
    pub value: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_label: Option<String>,
}

impl Score {
    pub fn probability(value: f32) -> Self {
        Self {
            kind: ScoreKind::Probability,
            value,
            raw_label: None,
        }
    }

    pub fn regression(value: f32) -> Self {
        Self {
            kind: ScoreKind::Regression,
            value,
            raw_label: None,
        }
    }

    pub fn class_index(index: usize, label: impl Into<String>) -> Self {
        Self {
            kind: ScoreKind::ClassIndex,
            value: index as f32,
            raw_label: Some(label.into()),
        }
    }
}

/// Final human-facing risk or class label
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for Category {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Result of one dispatched prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub domain: String,
    pub model: String,
    pub category: Category,
    pub score: Score,
}
