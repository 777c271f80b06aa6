//! Error types for feature validation, inference and artifact loading
//!
//! Request-scoped failures are [`PredictError`]; they never touch shared
//! state. Startup failures are [`ArtifactError`] and are fatal.

use std::path::PathBuf;

/// Failure of a single prediction request
#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    /// A scalar could not be read as a finite number
    #[error("invalid input for '{field}': {reason}")]
    InvalidInput { field: String, reason: String },

    /// Wrong number of values for the active domain or transform
    #[error("shape mismatch: expected {expected} values, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    /// A name-keyed input did not carry a required feature
    #[error("missing feature '{0}'")]
    MissingFeature(String),

    /// The requested model is not in the registry
    #[error("unknown model '{0}'")]
    UnknownModel(String),

    /// The backend call failed or produced an unusable output
    #[error("model '{model}' failed: {source}")]
    ModelInvocation {
        model: String,
        #[source]
        source: BackendError,
    },
}

impl PredictError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn shape(expected: usize, got: usize) -> Self {
        Self::ShapeMismatch { expected, got }
    }

    /// Stable identifier used for metric labels and API bodies
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "invalid_input",
            Self::ShapeMismatch { .. } => "shape_mismatch",
            Self::MissingFeature(_) => "missing_feature",
            Self::UnknownModel(_) => "unknown_model",
            Self::ModelInvocation { .. } => "model_invocation",
        }
    }
}

/// Failure inside a model backend
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("{backend} backend does not support {operation}")]
    Unsupported {
        backend: &'static str,
        operation: &'static str,
    },

    #[error("backend expected {expected} inputs, got {got}")]
    Arity { expected: usize, got: usize },

    #[error("backend produced no output")]
    EmptyOutput,

    #[error("malformed output: {0}")]
    MalformedOutput(String),

    #[error("output column {index} out of range for {width} columns")]
    MissingColumn { index: usize, width: usize },

    #[error("probability {0} outside [0, 1]")]
    ProbabilityOutOfRange(f32),

    #[error("expected a single regression output, got {0} values")]
    NotScalar(usize),

    #[error("non-finite output {0}")]
    NonFinite(f32),

    #[error("class index {index} has no label ({labels} known)")]
    UnknownClass { index: usize, labels: usize },

    #[error("score kind {0} is not accepted by the risk policy")]
    IncompatibleScore(&'static str),

    #[error("onnx runtime: {0}")]
    Onnx(String),
}

/// Fatal failure while loading artifacts at startup
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("missing artifact {0}")]
    Missing(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("checksum mismatch for {path}: expected {expected}, got {actual}")]
    Checksum {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("invalid artifact {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },

    #[error("domain '{domain}': {reason}")]
    Incompatible { domain: String, reason: String },

    #[error("failed to load onnx graph {path}: {reason}")]
    Onnx { path: PathBuf, reason: String },
}

impl ArtifactError {
    pub fn invalid(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn incompatible(domain: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Incompatible {
            domain: domain.into(),
            reason: reason.into(),
        }
    }
}
