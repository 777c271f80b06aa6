//! Decision tree ensembles (random forests, gradient boosting)

use super::{binary, sigmoid, softmax};
use crate::error::BackendError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    /// `x[feature] <= threshold` goes left
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
    Leaf { value: Vec<f32> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    fn leaf(&self, x: &[f32]) -> &[f32] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    fn validate(&self, n_features: usize, outputs: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    left,
                    right,
                    threshold,
                } => {
                    if *feature >= n_features {
                        return Err(format!("node {} splits on feature {}", i, feature));
                    }
                    // children after parents keeps traversal acyclic
                    if *left <= i || *right <= i {
                        return Err(format!("node {} points backwards", i));
                    }
                    if *left >= self.nodes.len() || *right >= self.nodes.len() {
                        return Err(format!("node {} has a dangling child", i));
                    }
                    if threshold.is_nan() {
                        return Err(format!("node {} has a NaN threshold", i));
                    }
                }
                Node::Leaf { value } => {
                    if value.len() != outputs {
                        return Err(format!(
                            "leaf {} has {} values, expected {}",
                            i,
                            value.len(),
                            outputs
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Mean of leaf values; leaves hold class distributions or values
    Average,
    /// `base_score + learning_rate * sum(leaves)`
    Additive {
        base_score: Vec<f32>,
        learning_rate: f32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    pub n_features: usize,
    pub n_outputs: usize,
    pub aggregation: Aggregation,
    pub trees: Vec<Tree>,
}

impl TreeEnsemble {
    pub fn outputs(&self) -> usize {
        self.n_outputs
    }

    pub fn is_additive(&self) -> bool {
        matches!(self.aggregation, Aggregation::Additive { .. })
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.trees.is_empty() {
            return Err("ensemble has no trees".to_string());
        }
        if self.n_features == 0 || self.n_outputs == 0 {
            return Err("ensemble needs at least one feature and one output".to_string());
        }
        if let Aggregation::Additive { base_score, .. } = &self.aggregation {
            if base_score.len() != self.n_outputs {
                return Err(format!(
                    "base_score has {} entries, expected {}",
                    base_score.len(),
                    self.n_outputs
                ));
            }
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features, self.n_outputs)
                .map_err(|e| format!("tree {}: {}", i, e))?;
        }
        Ok(())
    }

    pub(crate) fn raw(&self, x: &[f32]) -> Vec<f32> {
        let mut acc = vec![0.0_f32; self.n_outputs];
        for tree in &self.trees {
            for (a, v) in acc.iter_mut().zip(tree.leaf(x)) {
                *a += v;
            }
        }
        match &self.aggregation {
            Aggregation::Average => {
                let n = self.trees.len() as f32;
                acc.iter_mut().for_each(|a| *a /= n);
            }
            Aggregation::Additive {
                base_score,
                learning_rate,
            } => {
                for (a, b) in acc.iter_mut().zip(base_score) {
                    *a = b + learning_rate * *a;
                }
            }
        }
        acc
    }

    pub(crate) fn proba(&self, x: &[f32]) -> Result<Vec<f32>, BackendError> {
        let mut out = self.raw(x);
        match &self.aggregation {
            Aggregation::Average if out.len() == 1 => Err(BackendError::Unsupported {
                backend: "tree_ensemble",
                operation: "predict_proba on a single-output average ensemble",
            }),
            Aggregation::Average => {
                let sum: f32 = out.iter().sum();
                if sum > 0.0 {
                    out.iter_mut().for_each(|v| *v /= sum);
                }
                Ok(out)
            }
            Aggregation::Additive { .. } if out.len() == 1 => Ok(binary(sigmoid(out[0]))),
            Aggregation::Additive { .. } => {
                softmax(&mut out);
                Ok(out)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(feature: usize, threshold: f32, left: Vec<f32>, right: Vec<f32>) -> Tree {
        Tree {
            nodes: vec![
                Node::Split {
                    feature,
                    threshold,
                    left: 1,
                    right: 2,
                },
                Node::Leaf { value: left },
                Node::Leaf { value: right },
            ],
        }
    }

    fn forest() -> TreeEnsemble {
        TreeEnsemble {
            n_features: 2,
            n_outputs: 2,
            aggregation: Aggregation::Average,
            trees: vec![
                stump(0, 0.0, vec![1.0, 0.0], vec![0.2, 0.8]),
                stump(1, 5.0, vec![0.6, 0.4], vec![0.0, 1.0]),
            ],
        }
    }

    #[test]
    fn test_random_forest_averages_leaf_distributions() {
        let f = forest();
        f.validate().unwrap();
        let p = f.proba(&[1.0, 10.0]).unwrap();
        assert!((p[1] - 0.9).abs() < 1e-6);

        // threshold is inclusive on the left branch
        let p = f.proba(&[0.0, 5.0]).unwrap();
        assert!((p[1] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_gradient_boosting_binary() {
        let gb = TreeEnsemble {
            n_features: 1,
            n_outputs: 1,
            aggregation: Aggregation::Additive {
                base_score: vec![0.0],
                learning_rate: 0.5,
            },
            trees: vec![stump(0, 0.0, vec![-2.0], vec![2.0])],
        };
        gb.validate().unwrap();
        assert_eq!(gb.raw(&[1.0]), vec![1.0]);

        let p = gb.proba(&[1.0]).unwrap();
        assert_eq!(p.len(), 2);
        assert!((p[1] - sigmoid(1.0)).abs() < 1e-6);
    }

    #[test]
    fn test_regression_forest_has_no_probabilities() {
        let reg = TreeEnsemble {
            n_features: 1,
            n_outputs: 1,
            aggregation: Aggregation::Average,
            trees: vec![stump(0, 0.0, vec![10.0], vec![50.0])],
        };
        assert_eq!(reg.raw(&[1.0]), vec![50.0]);
        assert!(reg.proba(&[1.0]).is_err());
    }

    #[test]
    fn test_validation_rejects_cycles_and_bad_features() {
        let mut f = forest();
        f.trees[0].nodes[0] = Node::Split {
            feature: 0,
            threshold: 0.0,
            left: 0,
            right: 2,
        };
        assert!(f.validate().is_err());

        let mut f = forest();
        f.trees[1].nodes[0] = Node::Split {
            feature: 7,
            threshold: 0.0,
            left: 1,
            right: 2,
        };
        assert!(f.validate().is_err());

        let mut f = forest();
        f.trees[0].nodes[1] = Node::Leaf { value: vec![1.0] };
        assert!(f.validate().is_err());
    }

    #[test]
    fn test_nodes_deserialize_untagged() {
        let tree: Tree = serde_json::from_str(
            r#"{"nodes": [
                {"feature": 0, "threshold": 1.5, "left": 1, "right": 2},
                {"value": [0.9, 0.1]},
                {"value": [0.1, 0.9]}
            ]}"#,
        )
        .unwrap();
        assert_eq!(tree.leaf(&[2.0]), &[0.1, 0.9]);
    }
}
