//! Core library for clinical risk prediction
//!
//! This crate provides:
//! - Feature vector validation for the built-in clinical domains
//! - Fitted preprocessing (standardization, PCA)
//! - Model backends (native JSON estimators, ONNX graphs via tract)
//! - Inference dispatch and risk categorization
//! - Artifact loading, observability and file ingestion

pub mod artifacts;
pub mod backend;
pub mod domains;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod models;
pub mod observability;
pub mod predictor;

pub use artifacts::{compute_checksum, ArtifactStore};
pub use domains::{DomainId, DomainSpec};
pub use engine::PredictionEngine;
pub use error::{ArtifactError, BackendError, PredictError};
pub use models::*;
pub use observability::{PredictorMetrics, StructuredLogger};
pub use predictor::{InferenceDispatcher, RawInput};
