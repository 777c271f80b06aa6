//! Soft and hard voting over member estimators

use super::{argmax, Estimator};
use crate::error::BackendError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Voting {
    /// Weighted mean of member probabilities
    Soft,
    /// Weighted share of member class votes
    Hard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VotingEnsemble {
    pub voting: Voting,
    pub n_classes: usize,
    pub members: Vec<Estimator>,
    #[serde(default)]
    pub weights: Option<Vec<f32>>,
}

impl VotingEnsemble {
    pub fn n_features(&self) -> usize {
        self.members
            .first()
            .map(|m| super::Backend::input_arity(m))
            .unwrap_or(0)
    }

    fn weight(&self, i: usize) -> f32 {
        self.weights.as_ref().map(|w| w[i]).unwrap_or(1.0)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.members.is_empty() {
            return Err("voting ensemble has no members".to_string());
        }
        if self.n_classes < 2 {
            return Err("voting ensemble needs at least two classes".to_string());
        }
        if let Some(weights) = &self.weights {
            if weights.len() != self.members.len() {
                return Err(format!(
                    "{} weights for {} members",
                    weights.len(),
                    self.members.len()
                ));
            }
            if weights.iter().any(|w| !w.is_finite() || *w < 0.0) || weights.iter().sum::<f32>() <= 0.0 {
                return Err("weights must be non-negative with a positive sum".to_string());
            }
        }
        let arity = self.n_features();
        for (i, member) in self.members.iter().enumerate() {
            member.validate().map_err(|e| format!("member {}: {}", i, e))?;
            if super::Backend::input_arity(member) != arity {
                return Err(format!("member {} expects a different input arity", i));
            }
            if !member.has_proba() {
                return Err(format!("member {} has no class probabilities", i));
            }
            if member.proba_width() != self.n_classes {
                return Err(format!(
                    "member {} yields {} class probabilities, expected {}",
                    i,
                    member.proba_width(),
                    self.n_classes
                ));
            }
        }
        Ok(())
    }

    pub(crate) fn proba(&self, x: &[f32]) -> Result<Vec<f32>, BackendError> {
        let mut acc = vec![0.0_f32; self.n_classes];
        let mut total = 0.0_f32;
        for (i, member) in self.members.iter().enumerate() {
            let w = self.weight(i);
            let member_proba = member.proba_row(x)?;
            match self.voting {
                Voting::Soft => {
                    for (a, p) in acc.iter_mut().zip(&member_proba) {
                        *a += w * p;
                    }
                }
                Voting::Hard => {
                    let class = argmax(member_proba.iter().copied())
                        .ok_or(BackendError::EmptyOutput)?;
                    let slot = acc.get_mut(class).ok_or(BackendError::UnknownClass {
                        index: class,
                        labels: self.n_classes,
                    })?;
                    *slot += w;
                }
            }
            total += w;
        }
        acc.iter_mut().for_each(|a| *a /= total);
        Ok(acc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Aggregation, Link, LinearModel, Node, Tree, TreeEnsemble};

    fn member(bias: [f32; 3]) -> Estimator {
        Estimator::Linear(LinearModel {
            coef: vec![vec![0.0], vec![0.0], vec![0.0]],
            intercept: bias.to_vec(),
            link: Link::Softmax,
        })
    }

    #[test]
    fn test_soft_voting_averages() {
        let v = VotingEnsemble {
            voting: Voting::Soft,
            n_classes: 3,
            members: vec![member([5.0, 0.0, 0.0]), member([0.0, 0.0, 5.0])],
            weights: None,
        };
        v.validate().unwrap();
        let p = v.proba(&[1.0]).unwrap();
        assert!((p.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert!((p[0] - p[2]).abs() < 1e-6);
    }

    #[test]
    fn test_hard_voting_uses_weights() {
        let v = VotingEnsemble {
            voting: Voting::Hard,
            n_classes: 3,
            members: vec![
                member([5.0, 0.0, 0.0]),
                member([0.0, 0.0, 5.0]),
                member([0.0, 0.0, 5.0]),
            ],
            weights: Some(vec![3.0, 1.0, 1.0]),
        };
        v.validate().unwrap();
        let p = v.proba(&[1.0]).unwrap();
        assert_eq!(p, vec![0.6, 0.0, 0.4]);
        assert_eq!(argmax(p.into_iter()), Some(0));
    }

    #[test]
    fn test_validation_catches_mismatched_members() {
        let v = VotingEnsemble {
            voting: Voting::Soft,
            n_classes: 2,
            members: vec![member([0.0, 0.0, 0.0])],
            weights: None,
        };
        assert!(v.validate().is_err());

        let v = VotingEnsemble {
            voting: Voting::Hard,
            n_classes: 3,
            members: vec![member([0.0, 0.0, 0.0])],
            weights: Some(vec![1.0, 1.0]),
        };
        assert!(v.validate().is_err());
    }

    #[test]
    fn test_members_without_probabilities_rejected_in_both_modes() {
        let regressor = Estimator::Linear(LinearModel {
            coef: vec![vec![1.0]],
            intercept: vec![0.0],
            link: Link::Identity,
        });
        let value_forest = Estimator::TreeEnsemble(TreeEnsemble {
            n_features: 1,
            n_outputs: 1,
            aggregation: Aggregation::Average,
            trees: vec![Tree {
                nodes: vec![Node::Leaf { value: vec![3.0] }],
            }],
        });

        for voting in [Voting::Soft, Voting::Hard] {
            for bad in [regressor.clone(), value_forest.clone()] {
                let v = VotingEnsemble {
                    voting,
                    n_classes: 2,
                    members: vec![bad],
                    weights: None,
                };
                let err = v.validate().unwrap_err();
                assert!(err.contains("no class probabilities"), "{}", err);
            }

            // wider than the declared class count
            let v = VotingEnsemble {
                voting,
                n_classes: 2,
                members: vec![member([0.0, 0.0, 0.0])],
                weights: None,
            };
            assert!(v.validate().is_err());
        }
    }
}
