//! Frozen preprocessing transforms
//!
//! Fitted parameters are loaded once from JSON artifacts and never change.
//! Every call allocates its own output; nothing is cached between requests.

use crate::error::PredictError;
use crate::models::FeatureVector;
use serde::{Deserialize, Serialize};

/// One fitted transform step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransformStep {
    /// `(x - mean) / scale`
    StandardScaler { mean: Vec<f32>, scale: Vec<f32> },
    /// `components · (x - mean)`, one output per component row
    Pca {
        mean: Vec<f32>,
        components: Vec<Vec<f32>>,
    },
}

impl TransformStep {
    pub fn input_arity(&self) -> usize {
        match self {
            Self::StandardScaler { mean, .. } | Self::Pca { mean, .. } => mean.len(),
        }
    }

    pub fn output_arity(&self) -> usize {
        match self {
            Self::StandardScaler { mean, .. } => mean.len(),
            Self::Pca { components, .. } => components.len(),
        }
    }

    /// Checks internal consistency of the fitted parameters
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::StandardScaler { mean, scale } => {
                if mean.is_empty() {
                    return Err("scaler has no features".to_string());
                }
                if mean.len() != scale.len() {
                    return Err(format!(
                        "scaler mean has {} entries but scale has {}",
                        mean.len(),
                        scale.len()
                    ));
                }
                if mean.iter().chain(scale).any(|v| !v.is_finite()) {
                    return Err("scaler parameters must be finite".to_string());
                }
            }
            Self::Pca { mean, components } => {
                if mean.is_empty() || components.is_empty() {
                    return Err("pca has no features or components".to_string());
                }
                if let Some((i, row)) = components
                    .iter()
                    .enumerate()
                    .find(|(_, row)| row.len() != mean.len())
                {
                    return Err(format!(
                        "pca component {} has {} weights, expected {}",
                        i,
                        row.len(),
                        mean.len()
                    ));
                }
                if mean.iter().chain(components.iter().flatten()).any(|v| !v.is_finite()) {
                    return Err("pca parameters must be finite".to_string());
                }
            }
        }
        Ok(())
    }

    fn apply(&self, input: &[f32]) -> Vec<f32> {
        match self {
            Self::StandardScaler { mean, scale } => input
                .iter()
                .zip(mean.iter().zip(scale))
                .map(|(x, (m, s))| {
                    // zero-variance features are centred only
                    let s = if *s == 0.0 { 1.0 } else { *s };
                    (x - m) / s
                })
                .collect(),
            Self::Pca { mean, components } => components
                .iter()
                .map(|row| {
                    row.iter()
                        .zip(input.iter().zip(mean))
                        .map(|(w, (x, m))| w * (x - m))
                        .sum::<f32>()
                })
                .collect(),
        }
    }
}

/// Ordered chain of fitted transform steps
#[derive(Debug, Clone, PartialEq)]
pub struct Preprocessor {
    steps: Vec<TransformStep>,
}

impl Preprocessor {
    pub fn new(steps: Vec<TransformStep>) -> Result<Self, String> {
        if steps.is_empty() {
            return Err("preprocessor needs at least one step".to_string());
        }
        for step in &steps {
            step.validate()?;
        }
        for (i, pair) in steps.windows(2).enumerate() {
            if pair[0].output_arity() != pair[1].input_arity() {
                return Err(format!(
                    "step {} outputs {} values but step {} expects {}",
                    i,
                    pair[0].output_arity(),
                    i + 1,
                    pair[1].input_arity()
                ));
            }
        }
        Ok(Self { steps })
    }

    pub fn input_arity(&self) -> usize {
        self.steps[0].input_arity()
    }

    pub fn output_arity(&self) -> usize {
        self.steps[self.steps.len() - 1].output_arity()
    }

    pub fn steps(&self) -> &[TransformStep] {
        &self.steps
    }

    pub fn transform(&self, features: &FeatureVector) -> Result<Vec<f32>, PredictError> {
        if features.len() != self.input_arity() {
            return Err(PredictError::shape(self.input_arity(), features.len()));
        }
        let mut current = features.values().to_vec();
        for step in &self.steps {
            current = step.apply(&current);
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::{FeatureSchema, RawInput};

    fn vector(values: &[f32]) -> FeatureVector {
        FeatureSchema::positional(values.len())
            .build(&RawInput::Positional(values.to_vec()))
            .unwrap()
    }

    fn scaler() -> TransformStep {
        TransformStep::StandardScaler {
            mean: vec![1.0, 2.0, 3.0],
            scale: vec![2.0, 0.0, 0.5],
        }
    }

    #[test]
    fn test_standard_scaler() {
        let pre = Preprocessor::new(vec![scaler()]).unwrap();
        let out = pre.transform(&vector(&[3.0, 5.0, 4.0])).unwrap();
        assert_eq!(out, vec![1.0, 3.0, 2.0]);
        assert_eq!(pre.output_arity(), 3);
    }

    #[test]
    fn test_scaler_then_pca_reduces_arity() {
        let pca = TransformStep::Pca {
            mean: vec![0.0, 0.0, 0.0],
            components: vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 1.0]],
        };
        let pre = Preprocessor::new(vec![scaler(), pca]).unwrap();
        assert_eq!(pre.input_arity(), 3);
        assert_eq!(pre.output_arity(), 2);

        let out = pre.transform(&vector(&[3.0, 5.0, 4.0])).unwrap();
        assert_eq!(out, vec![1.0, 5.0]);
    }

    #[test]
    fn test_transform_is_pure() {
        let pre = Preprocessor::new(vec![scaler()]).unwrap();
        let input = vector(&[3.0, 5.0, 4.0]);
        let first = pre.transform(&input).unwrap();
        let second = pre.transform(&input).unwrap();
        assert_eq!(first, second);
        assert_eq!(input.values(), &[3.0, 5.0, 4.0]);
    }

    #[test]
    fn test_arity_mismatch() {
        let pre = Preprocessor::new(vec![scaler()]).unwrap();
        let err = pre.transform(&vector(&[1.0, 2.0])).unwrap_err();
        assert!(matches!(
            err,
            PredictError::ShapeMismatch {
                expected: 3,
                got: 2
            }
        ));
    }

    #[test]
    fn test_rejects_broken_chains() {
        let pca = TransformStep::Pca {
            mean: vec![0.0, 0.0],
            components: vec![vec![1.0, 0.0]],
        };
        assert!(Preprocessor::new(vec![scaler(), pca]).is_err());

        let ragged = TransformStep::StandardScaler {
            mean: vec![0.0, 0.0],
            scale: vec![1.0],
        };
        assert!(Preprocessor::new(vec![ragged]).is_err());
        assert!(Preprocessor::new(vec![]).is_err());
    }

    #[test]
    fn test_steps_deserialize_from_artifact_json() {
        let step: TransformStep =
            serde_json::from_str(r#"{"type": "standard_scaler", "mean": [0.5], "scale": [2.0]}"#)
                .unwrap();
        assert_eq!(step.input_arity(), 1);

        let step: TransformStep = serde_json::from_str(
            r#"{"type": "pca", "mean": [0.0, 0.0], "components": [[0.6, 0.8]]}"#,
        )
        .unwrap();
        assert_eq!(step.output_arity(), 1);
    }
}
