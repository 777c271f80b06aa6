//! Native call conventions of frozen model artifacts
//!
//! A [`Backend`] exposes the interfaces a fitted model offers (class
//! probabilities, raw outputs, class indices) over a `rows x features`
//! batch. Adapters in [`crate::predictor`] pick one convention per model
//! and hide the batch shape from callers.

mod forest;
mod linear;
mod onnx;
mod voting;

pub use forest::{Aggregation, Node, Tree, TreeEnsemble};
pub use linear::{Link, LinearModel};
pub use onnx::OnnxBackend;
pub use voting::{Voting, VotingEnsemble};

use crate::error::BackendError;
use serde::{Deserialize, Serialize};
use tract_onnx::prelude::tract_ndarray::{Array2, ArrayView2};

/// Trait for model backends
pub trait Backend: Send + Sync {
    /// Short identifier of the backend family
    fn family(&self) -> &'static str;

    /// Number of features each row must carry
    fn input_arity(&self) -> usize;

    /// Class probabilities, one row per input row
    fn predict_proba(&self, batch: ArrayView2<'_, f32>) -> Result<Array2<f32>, BackendError>;

    /// Untransformed model outputs (margins or regression values)
    fn predict_raw(&self, batch: ArrayView2<'_, f32>) -> Result<Array2<f32>, BackendError>;

    /// Predicted class index per row
    fn predict_class(&self, batch: ArrayView2<'_, f32>) -> Result<Vec<usize>, BackendError> {
        let proba = self.predict_proba(batch)?;
        proba
            .rows()
            .into_iter()
            .map(|row| argmax(row.iter().copied()).ok_or(BackendError::EmptyOutput))
            .collect()
    }
}

/// Native estimator artifact, tagged by `"type"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Estimator {
    Linear(LinearModel),
    TreeEnsemble(TreeEnsemble),
    Voting(VotingEnsemble),
}

impl Estimator {
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::Linear(m) => m.validate(),
            Self::TreeEnsemble(m) => m.validate(),
            Self::Voting(m) => m.validate(),
        }
    }

    pub(crate) fn raw_row(&self, x: &[f32]) -> Result<Vec<f32>, BackendError> {
        match self {
            Self::Linear(m) => Ok(m.decision(x)),
            Self::TreeEnsemble(m) => Ok(m.raw(x)),
            Self::Voting(m) => m.proba(x),
        }
    }

    pub(crate) fn proba_row(&self, x: &[f32]) -> Result<Vec<f32>, BackendError> {
        match self {
            Self::Linear(m) => m.proba(x),
            Self::TreeEnsemble(m) => m.proba(x),
            Self::Voting(m) => m.proba(x),
        }
    }

    fn output_width(&self) -> usize {
        match self {
            Self::Linear(m) => m.outputs(),
            Self::TreeEnsemble(m) => m.outputs(),
            Self::Voting(m) => m.n_classes,
        }
    }

    /// Whether `predict_proba` is defined for this estimator
    fn has_proba(&self) -> bool {
        match self {
            Self::Linear(m) => m.link != Link::Identity,
            Self::TreeEnsemble(m) => m.is_additive() || m.outputs() > 1,
            Self::Voting(_) => true,
        }
    }

    fn proba_width(&self) -> usize {
        match self {
            Self::Linear(m) if m.outputs() == 1 => 2,
            Self::TreeEnsemble(m) if m.is_additive() && m.outputs() == 1 => 2,
            other => other.output_width(),
        }
    }
}

impl Backend for Estimator {
    fn family(&self) -> &'static str {
        match self {
            Self::Linear(_) => "linear",
            Self::TreeEnsemble(_) => "tree_ensemble",
            Self::Voting(_) => "voting",
        }
    }

    fn input_arity(&self) -> usize {
        match self {
            Self::Linear(m) => m.n_features(),
            Self::TreeEnsemble(m) => m.n_features,
            Self::Voting(m) => m.n_features(),
        }
    }

    fn predict_proba(&self, batch: ArrayView2<'_, f32>) -> Result<Array2<f32>, BackendError> {
        check_arity(&batch, self.input_arity())?;
        map_rows(batch, self.proba_width(), |x| self.proba_row(x))
    }

    fn predict_raw(&self, batch: ArrayView2<'_, f32>) -> Result<Array2<f32>, BackendError> {
        check_arity(&batch, self.input_arity())?;
        map_rows(batch, self.output_width(), |x| self.raw_row(x))
    }
}

pub(crate) fn check_arity(batch: &ArrayView2<'_, f32>, expected: usize) -> Result<(), BackendError> {
    if batch.ncols() != expected {
        return Err(BackendError::Arity {
            expected,
            got: batch.ncols(),
        });
    }
    Ok(())
}

fn map_rows<F>(batch: ArrayView2<'_, f32>, width: usize, f: F) -> Result<Array2<f32>, BackendError>
where
    F: Fn(&[f32]) -> Result<Vec<f32>, BackendError>,
{
    let mut flat = Vec::with_capacity(batch.nrows() * width);
    for row in batch.rows() {
        let row = row.to_vec();
        let out = f(&row)?;
        if out.len() != width {
            return Err(BackendError::MalformedOutput(format!(
                "row produced {} values, expected {}",
                out.len(),
                width
            )));
        }
        flat.extend(out);
    }
    Array2::from_shape_vec((batch.nrows(), width), flat)
        .map_err(|e| BackendError::MalformedOutput(e.to_string()))
}

pub(crate) fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

pub(crate) fn softmax(values: &mut [f32]) {
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0;
    for v in values.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    if sum > 0.0 {
        for v in values.iter_mut() {
            *v /= sum;
        }
    }
}

/// Index of the largest value; ties resolve to the lowest index
pub(crate) fn argmax(values: impl Iterator<Item = f32>) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, v) in values.enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Expands a single positive-class probability into `[1 - p, p]`
pub(crate) fn binary(p: f32) -> Vec<f32> {
    vec![1.0 - p, p]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tract_onnx::prelude::tract_ndarray::arr2;

    #[test]
    fn test_softmax_sums_to_one() {
        let mut v = vec![1.0, 2.0, 3.0];
        softmax(&mut v);
        assert!((v.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        assert!(v[2] > v[1] && v[1] > v[0]);
    }

    #[test]
    fn test_argmax_prefers_first_on_ties() {
        assert_eq!(argmax([0.2, 0.4, 0.4].into_iter()), Some(1));
        assert_eq!(argmax(std::iter::empty()), None);
    }

    #[test]
    fn test_estimator_artifact_round_trip() {
        let json = r#"{
            "type": "linear",
            "link": "logistic",
            "coef": [[1.0, -1.0]],
            "intercept": [0.0]
        }"#;
        let est: Estimator = serde_json::from_str(json).unwrap();
        est.validate().unwrap();
        assert_eq!(est.family(), "linear");
        assert_eq!(est.input_arity(), 2);

        let proba = est.predict_proba(arr2(&[[2.0_f32, 2.0]]).view()).unwrap();
        assert_eq!(proba.shape(), &[1, 2]);
        assert!((proba[[0, 1]] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_estimator_rejects_wrong_arity() {
        let est = Estimator::Linear(LinearModel {
            coef: vec![vec![1.0, 2.0]],
            intercept: vec![0.0],
            link: Link::Identity,
        });
        let err = est.predict_raw(arr2(&[[1.0_f32]]).view()).unwrap_err();
        assert!(matches!(
            err,
            BackendError::Arity {
                expected: 2,
                got: 1
            }
        ));
    }
}
