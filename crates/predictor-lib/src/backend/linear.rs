//! Linear and generalized linear estimators

use super::{binary, sigmoid, softmax};
use crate::error::BackendError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Link {
    /// Linear regression; no probability interface
    #[default]
    Identity,
    /// Binary or one-vs-rest logistic regression
    Logistic,
    /// Multinomial logistic regression
    Softmax,
}

/// `coef · x + intercept`, one row of `coef` per output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub coef: Vec<Vec<f32>>,
    pub intercept: Vec<f32>,
    #[serde(default)]
    pub link: Link,
}

impl LinearModel {
    pub fn n_features(&self) -> usize {
        self.coef.first().map(Vec::len).unwrap_or(0)
    }

    pub fn outputs(&self) -> usize {
        self.coef.len()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.coef.is_empty() || self.n_features() == 0 {
            return Err("linear model has no coefficients".to_string());
        }
        if self.coef.iter().any(|row| row.len() != self.n_features()) {
            return Err("coefficient rows have different widths".to_string());
        }
        if self.intercept.len() != self.coef.len() {
            return Err(format!(
                "{} intercepts for {} coefficient rows",
                self.intercept.len(),
                self.coef.len()
            ));
        }
        if self.link == Link::Softmax && self.outputs() < 2 {
            return Err("softmax link needs at least two classes".to_string());
        }
        Ok(())
    }

    pub(crate) fn decision(&self, x: &[f32]) -> Vec<f32> {
        self.coef
            .iter()
            .zip(&self.intercept)
            .map(|(row, b)| row.iter().zip(x).map(|(w, v)| w * v).sum::<f32>() + b)
            .collect()
    }

    pub(crate) fn proba(&self, x: &[f32]) -> Result<Vec<f32>, BackendError> {
        let mut margins = self.decision(x);
        match self.link {
            Link::Identity => Err(BackendError::Unsupported {
                backend: "linear",
                operation: "predict_proba on an identity link",
            }),
            Link::Logistic if margins.len() == 1 => Ok(binary(sigmoid(margins[0]))),
            Link::Logistic => {
                // one-vs-rest: normalise independent sigmoids
                for m in margins.iter_mut() {
                    *m = sigmoid(*m);
                }
                let sum: f32 = margins.iter().sum();
                if sum > 0.0 {
                    for m in margins.iter_mut() {
                        *m /= sum;
                    }
                }
                Ok(margins)
            }
            Link::Softmax => {
                softmax(&mut margins);
                Ok(margins)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logistic() -> LinearModel {
        LinearModel {
            coef: vec![vec![2.0, 0.0]],
            intercept: vec![-1.0],
            link: Link::Logistic,
        }
    }

    #[test]
    fn test_binary_logistic_probabilities() {
        let m = logistic();
        let p = m.proba(&[0.5, 9.0]).unwrap();
        assert!((p[1] - 0.5).abs() < 1e-6);
        assert!((p[0] + p[1] - 1.0).abs() < 1e-6);

        let p = m.proba(&[3.0, 0.0]).unwrap();
        assert!(p[1] > 0.99);
    }

    #[test]
    fn test_identity_regression() {
        let m = LinearModel {
            coef: vec![vec![10.0, 2.0]],
            intercept: vec![1.0],
            link: Link::Identity,
        };
        assert_eq!(m.decision(&[5.0, 0.5]), vec![52.0]);
        assert!(m.proba(&[5.0, 0.5]).is_err());
    }

    #[test]
    fn test_softmax_multiclass() {
        let m = LinearModel {
            coef: vec![vec![1.0], vec![0.0], vec![-1.0]],
            intercept: vec![0.0, 0.0, 0.0],
            link: Link::Softmax,
        };
        let p = m.proba(&[2.0]).unwrap();
        assert_eq!(p.len(), 3);
        assert!((p.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        assert!(p[0] > p[1] && p[1] > p[2]);
    }

    #[test]
    fn test_validation() {
        assert!(logistic().validate().is_ok());

        let ragged = LinearModel {
            coef: vec![vec![1.0, 2.0], vec![1.0]],
            intercept: vec![0.0, 0.0],
            link: Link::Softmax,
        };
        assert!(ragged.validate().is_err());

        let missing_intercept = LinearModel {
            coef: vec![vec![1.0]],
            intercept: vec![],
            link: Link::Identity,
        };
        assert!(missing_intercept.validate().is_err());
    }
}
