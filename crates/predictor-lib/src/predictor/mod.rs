//! Multi-model inference pipeline

mod adapter;
mod dispatcher;
mod features;
mod output;
mod preprocess;
mod registry;

pub use adapter::{
    adapter_for, ProbabilisticClassifier, RawScoreClassifier, RawScoreRegressor, POSITIVE_CLASS,
    PROBABILITY_TOLERANCE,
};
pub use dispatcher::InferenceDispatcher;
pub use features::{FeatureSchema, RawInput};
pub use output::{RiskClassifier, RiskPolicy};
pub use preprocess::{Preprocessor, TransformStep};
pub use registry::ModelRegistry;

use crate::error::PredictError;
use crate::models::{BackendKind, Score};

/// Uniform wrapper around one model backend
pub trait ModelAdapter: Send + Sync {
    /// Display name used for selection
    fn name(&self) -> &str;

    /// Call convention invoked on the backend
    fn kind(&self) -> BackendKind;

    /// Length of the normalized vector the backend accepts
    fn input_arity(&self) -> usize;

    /// Run the backend on one normalized vector
    fn predict(&self, input: &[f32]) -> Result<Score, PredictError>;
}
