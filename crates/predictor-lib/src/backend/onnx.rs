//! ONNX inference using tract
//!
//! Runs exported neural networks (Keras) and skl2onnx classifiers. The
//! input fact is pinned to a single row so the graph is optimized once at
//! load time.

use super::{binary, check_arity, Backend};
use crate::domains::OnnxOutputs;
use crate::error::BackendError;
use anyhow::{Context, Result};
use std::time::Instant;
use tract_onnx::prelude::tract_ndarray::{Array2, ArrayView2};
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 50;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX graph behind the [`Backend`] interface
pub struct OnnxBackend {
    model: TractModel,
    arity: usize,
    outputs: OnnxOutputs,
}

impl std::fmt::Debug for OnnxBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxBackend")
            .field("arity", &self.arity)
            .field("outputs", &self.outputs)
            .finish()
    }
}

impl OnnxBackend {
    /// Load and optimize an ONNX graph from bytes
    pub fn from_bytes(bytes: &[u8], arity: usize, outputs: OnnxOutputs) -> Result<Self> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(bytes))
            .context("Failed to parse ONNX model")?;
        Self::prepare(model, arity, outputs)
    }

    fn prepare(model: InferenceModel, arity: usize, outputs: OnnxOutputs) -> Result<Self> {
        let model = model
            .with_input_fact(0, f32::fact([1, arity]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;

        let available = model.model().output_outlets()?.len();
        let needed = outputs.label.map_or(outputs.scores, |l| l.max(outputs.scores)) + 1;
        if available < needed {
            anyhow::bail!("Model has {} outputs, expected at least {}", available, needed);
        }

        Ok(Self {
            model,
            arity,
            outputs,
        })
    }

    fn run(&self, batch: ArrayView2<'_, f32>) -> Result<TVec<TValue>, BackendError> {
        check_arity(&batch, self.arity)?;
        if batch.nrows() != 1 {
            return Err(BackendError::MalformedOutput(format!(
                "graph accepts one row per call, got {}",
                batch.nrows()
            )));
        }

        let start = Instant::now();
        let input: Tensor = batch.to_owned().into();
        let result = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| BackendError::Onnx(format!("{:#}", e)))?;

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }
        Ok(result)
    }

    /// Score output reshaped to `rows x columns`
    fn scores(&self, batch: ArrayView2<'_, f32>) -> Result<Array2<f32>, BackendError> {
        let rows = batch.nrows();
        let result = self.run(batch)?;
        let output = result.get(self.outputs.scores).ok_or(BackendError::EmptyOutput)?;
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| BackendError::Onnx(format!("{:#}", e)))?;
        let values: Vec<f32> = view.iter().copied().collect();

        if values.is_empty() || values.len() % rows != 0 {
            return Err(BackendError::MalformedOutput(format!(
                "{} score values for {} rows",
                values.len(),
                rows
            )));
        }
        let cols = values.len() / rows;
        Array2::from_shape_vec((rows, cols), values)
            .map_err(|e| BackendError::MalformedOutput(e.to_string()))
    }
}

impl Backend for OnnxBackend {
    fn family(&self) -> &'static str {
        "onnx"
    }

    fn input_arity(&self) -> usize {
        self.arity
    }

    fn predict_proba(&self, batch: ArrayView2<'_, f32>) -> Result<Array2<f32>, BackendError> {
        let scores = self.scores(batch)?;
        if scores.ncols() != 1 {
            return Ok(scores);
        }
        // single sigmoid unit: column 0 is the positive class
        let rows: Vec<f32> = scores.iter().flat_map(|p| binary(*p)).collect();
        Array2::from_shape_vec((scores.nrows(), 2), rows)
            .map_err(|e| BackendError::MalformedOutput(e.to_string()))
    }

    fn predict_raw(&self, batch: ArrayView2<'_, f32>) -> Result<Array2<f32>, BackendError> {
        self.scores(batch)
    }

    fn predict_class(&self, batch: ArrayView2<'_, f32>) -> Result<Vec<usize>, BackendError> {
        let Some(label_output) = self.outputs.label else {
            let proba = self.predict_proba(batch)?;
            return proba
                .rows()
                .into_iter()
                .map(|row| super::argmax(row.iter().copied()).ok_or(BackendError::EmptyOutput))
                .collect();
        };

        let result = self.run(batch)?;
        let output = result.get(label_output).ok_or(BackendError::EmptyOutput)?;
        let view = output
            .to_array_view::<i64>()
            .map_err(|e| BackendError::Onnx(format!("{:#}", e)))?;
        view.iter()
            .map(|label| {
                usize::try_from(*label)
                    .map_err(|_| BackendError::MalformedOutput(format!("negative class label {}", label)))
            })
            .collect()
    }
}
