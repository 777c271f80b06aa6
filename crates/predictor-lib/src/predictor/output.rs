//! Risk categorization of normalized scores
//!
//! Breakpoint policies bucket probabilities and regression outputs into
//! ascending, closed-open intervals: a value exactly on a threshold
//! belongs to the more severe bucket. Lookup policies report the label the
//! adapter resolved from the class index.

use crate::domains::PolicySpec;
use crate::models::{Category, Score, ScoreKind};

#[derive(Debug, Clone, PartialEq)]
pub enum RiskPolicy {
    Breakpoints {
        floor: String,
        /// Strictly ascending lower bounds
        steps: Vec<(f32, String)>,
    },
    Lookup,
}

/// Maps a [`Score`] to the domain's discrete [`Category`]
#[derive(Debug, Clone, PartialEq)]
pub struct RiskClassifier {
    policy: RiskPolicy,
}

impl RiskClassifier {
    pub fn breakpoints<S: Into<String>>(
        floor: S,
        steps: impl IntoIterator<Item = (f32, S)>,
    ) -> Result<Self, String> {
        let steps: Vec<(f32, String)> = steps.into_iter().map(|(t, l)| (t, l.into())).collect();
        if steps.iter().any(|(t, _)| !t.is_finite()) {
            return Err("breakpoint thresholds must be finite".to_string());
        }
        if !steps.windows(2).all(|w| w[0].0 < w[1].0) {
            return Err("breakpoint thresholds must be strictly ascending".to_string());
        }
        Ok(Self {
            policy: RiskPolicy::Breakpoints {
                floor: floor.into(),
                steps,
            },
        })
    }

    pub fn lookup() -> Self {
        Self {
            policy: RiskPolicy::Lookup,
        }
    }

    /// Classifier for a catalog policy
    pub fn from_spec(policy: &PolicySpec) -> Result<Self, String> {
        match policy {
            PolicySpec::Breakpoints { floor, steps } => {
                Self::breakpoints(*floor, steps.iter().copied())
            }
            PolicySpec::Labels(_) => Ok(Self::lookup()),
        }
    }

    pub fn policy(&self) -> &RiskPolicy {
        &self.policy
    }

    /// Whether scores of `kind` can be labelled by this policy
    pub fn accepts(&self, kind: ScoreKind) -> bool {
        match self.policy {
            RiskPolicy::Breakpoints { .. } => {
                matches!(kind, ScoreKind::Probability | ScoreKind::Regression)
            }
            RiskPolicy::Lookup => kind == ScoreKind::ClassIndex,
        }
    }

    /// Category of `score`, or `None` when the score kind is not accepted
    pub fn label(&self, score: &Score) -> Option<Category> {
        if !self.accepts(score.kind) {
            return None;
        }
        match &self.policy {
            RiskPolicy::Breakpoints { floor, steps } => {
                let label = steps
                    .iter()
                    .rev()
                    .find(|(threshold, _)| score.value >= *threshold)
                    .map(|(_, label)| label)
                    .unwrap_or(floor);
                Some(Category::new(label.as_str()))
            }
            RiskPolicy::Lookup => score.raw_label.as_deref().map(Category::new),
        }
    }

    /// Every category this policy can emit, least severe first
    pub fn categories(&self) -> Vec<String> {
        match &self.policy {
            RiskPolicy::Breakpoints { floor, steps } => std::iter::once(floor.clone())
                .chain(steps.iter().map(|(_, l)| l.clone()))
                .collect(),
            RiskPolicy::Lookup => Vec::new(),
        }
    }
}
