//! Model adapters
//!
//! Each adapter owns one backend and invokes exactly one of its call
//! conventions, returning an already-normalized [`Score`].

use super::ModelAdapter;
use crate::backend::Backend;
use crate::error::{BackendError, PredictError};
use crate::models::{BackendKind, Score};
use std::sync::Arc;
use tract_onnx::prelude::tract_ndarray::ArrayView2;

/// Float slack tolerated on probability bounds before reporting a defect
pub const PROBABILITY_TOLERANCE: f32 = 1e-6;

/// Column of the positive class in binary probability outputs
pub const POSITIVE_CLASS: usize = 1;

fn batch_of_one(input: &[f32]) -> Result<ArrayView2<'_, f32>, BackendError> {
    ArrayView2::from_shape((1, input.len()), input)
        .map_err(|e| BackendError::MalformedOutput(e.to_string()))
}

fn invocation(model: &str, source: BackendError) -> PredictError {
    PredictError::ModelInvocation {
        model: model.to_string(),
        source,
    }
}

/// Reports the positive-class probability of a classifier
pub struct ProbabilisticClassifier {
    name: String,
    backend: Box<dyn Backend>,
    positive_class: usize,
}

impl ProbabilisticClassifier {
    pub fn new(name: impl Into<String>, backend: Box<dyn Backend>) -> Self {
        Self {
            name: name.into(),
            backend,
            positive_class: POSITIVE_CLASS,
        }
    }

    pub fn with_positive_class(mut self, column: usize) -> Self {
        self.positive_class = column;
        self
    }

    fn probability(&self, input: &[f32]) -> Result<f32, BackendError> {
        let proba = self.backend.predict_proba(batch_of_one(input)?)?;
        let row = proba.rows().into_iter().next().ok_or(BackendError::EmptyOutput)?;
        let p = match row.len() {
            0 => return Err(BackendError::EmptyOutput),
            1 => row[0],
            width => *row.get(self.positive_class).ok_or(BackendError::MissingColumn {
                index: self.positive_class,
                width,
            })?,
        };

        if !p.is_finite() {
            return Err(BackendError::NonFinite(p));
        }
        if p < -PROBABILITY_TOLERANCE || p > 1.0 + PROBABILITY_TOLERANCE {
            return Err(BackendError::ProbabilityOutOfRange(p));
        }
        Ok(p.clamp(0.0, 1.0))
    }
}

impl ModelAdapter for ProbabilisticClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        BackendKind::ProbabilisticClassifier
    }

    fn input_arity(&self) -> usize {
        self.backend.input_arity()
    }

    fn predict(&self, input: &[f32]) -> Result<Score, PredictError> {
        self.probability(input)
            .map(Score::probability)
            .map_err(|e| invocation(&self.name, e))
    }
}

/// Reports a single unbounded output as a severity score
pub struct RawScoreRegressor {
    name: String,
    backend: Box<dyn Backend>,
}

impl RawScoreRegressor {
    pub fn new(name: impl Into<String>, backend: Box<dyn Backend>) -> Self {
        Self {
            name: name.into(),
            backend,
        }
    }

    fn value(&self, input: &[f32]) -> Result<f32, BackendError> {
        let raw = self.backend.predict_raw(batch_of_one(input)?)?;
        if raw.len() != 1 {
            return Err(BackendError::NotScalar(raw.len()));
        }
        let v = raw[[0, 0]];
        if !v.is_finite() {
            return Err(BackendError::NonFinite(v));
        }
        Ok(v)
    }
}

impl ModelAdapter for RawScoreRegressor {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        BackendKind::RawScoreRegressor
    }

    fn input_arity(&self) -> usize {
        self.backend.input_arity()
    }

    fn predict(&self, input: &[f32]) -> Result<Score, PredictError> {
        self.value(input)
            .map(Score::regression)
            .map_err(|e| invocation(&self.name, e))
    }
}

/// Maps a predicted class index through a fixed label table
pub struct RawScoreClassifier {
    name: String,
    backend: Box<dyn Backend>,
    labels: Arc<[String]>,
}

impl RawScoreClassifier {
    pub fn new(name: impl Into<String>, backend: Box<dyn Backend>, labels: Arc<[String]>) -> Self {
        Self {
            name: name.into(),
            backend,
            labels,
        }
    }

    fn class(&self, input: &[f32]) -> Result<Score, BackendError> {
        let classes = self.backend.predict_class(batch_of_one(input)?)?;
        let index = *classes.first().ok_or(BackendError::EmptyOutput)?;
        let label = self.labels.get(index).ok_or(BackendError::UnknownClass {
            index,
            labels: self.labels.len(),
        })?;
        Ok(Score::class_index(index, label.clone()))
    }
}

impl ModelAdapter for RawScoreClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        BackendKind::RawScoreClassifier
    }

    fn input_arity(&self) -> usize {
        self.backend.input_arity()
    }

    fn predict(&self, input: &[f32]) -> Result<Score, PredictError> {
        self.class(input).map_err(|e| invocation(&self.name, e))
    }
}

/// Wraps a backend in the adapter matching `kind`
pub fn adapter_for(
    name: &str,
    kind: BackendKind,
    positive_class: usize,
    backend: Box<dyn Backend>,
    labels: Arc<[String]>,
) -> Box<dyn ModelAdapter> {
    match kind {
        BackendKind::ProbabilisticClassifier => Box::new(
            ProbabilisticClassifier::new(name, backend).with_positive_class(positive_class),
        ),
        BackendKind::RawScoreRegressor => Box::new(RawScoreRegressor::new(name, backend)),
        BackendKind::RawScoreClassifier => {
            Box::new(RawScoreClassifier::new(name, backend, labels))
        }
    }
}
