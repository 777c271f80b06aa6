//! Inference dispatcher
//!
//! One request is a single synchronous chain: feature validation,
//! preprocessing, registry lookup, model invocation and categorization.
//! All state is read-only after construction, so one dispatcher serves
//! concurrent callers without locking.

use super::{FeatureSchema, ModelRegistry, Preprocessor, RawInput, RiskClassifier};
use crate::error::{BackendError, PredictError};
use crate::models::Prediction;
use crate::observability::{PredictorMetrics, StructuredLogger};
use std::time::Instant;

#[derive(Debug)]
pub struct InferenceDispatcher {
    domain: String,
    schema: FeatureSchema,
    preprocessor: Option<Preprocessor>,
    registry: ModelRegistry,
    classifier: RiskClassifier,
    metrics: PredictorMetrics,
    logger: StructuredLogger,
}

impl InferenceDispatcher {
    /// Assemble a dispatcher, checking that every stage fits the next
    pub fn new(
        domain: impl Into<String>,
        schema: FeatureSchema,
        preprocessor: Option<Preprocessor>,
        registry: ModelRegistry,
        classifier: RiskClassifier,
    ) -> Result<Self, String> {
        if registry.is_empty() {
            return Err("no models registered".to_string());
        }

        let model_arity = match &preprocessor {
            Some(pre) => {
                if pre.input_arity() != schema.arity() {
                    return Err(format!(
                        "preprocessor expects {} features, schema has {}",
                        pre.input_arity(),
                        schema.arity()
                    ));
                }
                pre.output_arity()
            }
            None => schema.arity(),
        };

        for adapter in registry.iter() {
            if adapter.input_arity() != model_arity {
                return Err(format!(
                    "model '{}' expects {} inputs, pipeline produces {}",
                    adapter.name(),
                    adapter.input_arity(),
                    model_arity
                ));
            }
            let kind = adapter.kind().score_kind();
            if !classifier.accepts(kind) {
                return Err(format!(
                    "model '{}' yields {} scores which the risk policy cannot label",
                    adapter.name(),
                    kind.as_str()
                ));
            }
        }

        Ok(Self {
            domain: domain.into(),
            schema,
            preprocessor,
            registry,
            classifier,
            metrics: PredictorMetrics::new(),
            logger: StructuredLogger::new("local"),
        })
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn preprocessor(&self) -> Option<&Preprocessor> {
        self.preprocessor.as_ref()
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn classifier(&self) -> &RiskClassifier {
        &self.classifier
    }

    /// Run one prediction with the named model
    pub fn infer(&self, raw: &RawInput, model: &str) -> Result<Prediction, PredictError> {
        let start = Instant::now();
        let result = self.run(raw, model);
        let elapsed = start.elapsed();

        self.metrics
            .observe_inference_latency(&self.domain, elapsed.as_secs_f64());
        match &result {
            Ok(prediction) => {
                self.metrics
                    .inc_predictions(&self.domain, model, prediction.category.as_str());
                self.logger.log_prediction(
                    &self.domain,
                    model,
                    raw.source(),
                    prediction.category.as_str(),
                    prediction.score.kind.as_str(),
                    prediction.score.value,
                    elapsed.as_micros(),
                );
            }
            Err(e) => {
                self.metrics.inc_prediction_errors(&self.domain, e.kind());
                self.logger
                    .log_prediction_failed(&self.domain, model, e.kind(), &e.to_string());
            }
        }
        result
    }

    fn run(&self, raw: &RawInput, model: &str) -> Result<Prediction, PredictError> {
        let features = self.schema.build(raw)?;
        let normalized = match &self.preprocessor {
            Some(pre) => pre.transform(&features)?,
            None => features.values().to_vec(),
        };

        let adapter = self.registry.get(model)?;
        let score = adapter.predict(&normalized)?;
        let category = self
            .classifier
            .label(&score)
            .ok_or_else(|| PredictError::ModelInvocation {
                model: model.to_string(),
                source: BackendError::IncompatibleScore(score.kind.as_str()),
            })?;

        Ok(Prediction {
            domain: self.domain.clone(),
            model: adapter.name().to_string(),
            category,
            score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BackendKind, Score};
    use crate::predictor::{ModelAdapter, TransformStep};
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Adapter returning a fixed score and counting invocations
    struct Canned {
        name: &'static str,
        kind: BackendKind,
        arity: usize,
        score: Score,
        calls: Arc<AtomicUsize>,
    }

    impl ModelAdapter for Canned {
        fn name(&self) -> &str {
            self.name
        }

        fn kind(&self) -> BackendKind {
            self.kind
        }

        fn input_arity(&self) -> usize {
            self.arity
        }

        fn predict(&self, input: &[f32]) -> Result<Score, PredictError> {
            assert_eq!(input.len(), self.arity);
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.score.clone())
        }
    }

    fn dispatcher(
        arity: usize,
        kind: BackendKind,
        score: Score,
        classifier: RiskClassifier,
    ) -> (InferenceDispatcher, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ModelRegistry::new();
        registry
            .register(Box::new(Canned {
                name: "Model",
                kind,
                arity,
                score,
                calls: calls.clone(),
            }))
            .unwrap();
        let scaler = TransformStep::StandardScaler {
            mean: vec![0.0; arity],
            scale: vec![1.0; arity],
        };
        let d = InferenceDispatcher::new(
            "test",
            FeatureSchema::positional(arity),
            Some(Preprocessor::new(vec![scaler]).unwrap()),
            registry,
            classifier,
        )
        .unwrap();
        (d, calls)
    }

    fn alzheimers_policy() -> RiskClassifier {
        RiskClassifier::breakpoints(
            "Low Risk",
            [(0.4, "Moderate Risk"), (0.7, "High Risk")],
        )
        .unwrap()
    }

    #[test]
    fn test_probability_reaches_highest_bucket() {
        let (d, _) = dispatcher(
            32,
            BackendKind::ProbabilisticClassifier,
            Score::probability(0.85),
            alzheimers_policy(),
        );
        let p = d.infer(&RawInput::Positional(vec![0.5; 32]), "Model").unwrap();
        assert_eq!(p.category, "High Risk");
        assert_eq!(p.score, Score::probability(0.85));
    }

    #[test]
    fn test_unknown_model_before_backend_call() {
        let (d, calls) = dispatcher(
            4,
            BackendKind::ProbabilisticClassifier,
            Score::probability(0.2),
            alzheimers_policy(),
        );
        let err = d
            .infer(&RawInput::Positional(vec![1.0; 4]), "Nonexistent")
            .unwrap_err();
        assert!(matches!(err, PredictError::UnknownModel(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_short_input_is_shape_mismatch() {
        let (d, calls) = dispatcher(
            4,
            BackendKind::ProbabilisticClassifier,
            Score::probability(0.2),
            alzheimers_policy(),
        );
        let err = d
            .infer(&RawInput::Positional(vec![1.0; 3]), "Model")
            .unwrap_err();
        assert!(matches!(
            err,
            PredictError::ShapeMismatch {
                expected: 4,
                got: 3
            }
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_missing_manual_field() {
        let (d, _) = dispatcher(
            2,
            BackendKind::ProbabilisticClassifier,
            Score::probability(0.2),
            alzheimers_policy(),
        );
        let mut fields = BTreeMap::new();
        fields.insert("f0".to_string(), "1.0".to_string());
        let err = d.infer(&RawInput::Manual(fields), "Model").unwrap_err();
        assert!(matches!(err, PredictError::MissingFeature(name) if name == "f1"));
    }

    #[test]
    fn test_incompatible_policy_rejected_at_build() {
        let mut registry = ModelRegistry::new();
        registry
            .register(Box::new(Canned {
                name: "Voting",
                kind: BackendKind::RawScoreClassifier,
                arity: 2,
                score: Score::class_index(0, "a"),
                calls: Arc::new(AtomicUsize::new(0)),
            }))
            .unwrap();
        let err = InferenceDispatcher::new(
            "test",
            FeatureSchema::positional(2),
            None,
            registry,
            alzheimers_policy(),
        )
        .unwrap_err();
        assert!(err.contains("cannot label"));
    }

    #[test]
    fn test_arity_mismatch_rejected_at_build() {
        let mut registry = ModelRegistry::new();
        registry
            .register(Box::new(Canned {
                name: "Wide",
                kind: BackendKind::RawScoreRegressor,
                arity: 5,
                score: Score::regression(1.0),
                calls: Arc::new(AtomicUsize::new(0)),
            }))
            .unwrap();
        assert!(InferenceDispatcher::new(
            "test",
            FeatureSchema::positional(2),
            None,
            registry,
            alzheimers_policy(),
        )
        .is_err());
    }

    #[test]
    fn test_repeated_requests_are_identical() {
        let (d, calls) = dispatcher(
            18,
            BackendKind::RawScoreRegressor,
            Score::regression(52.0),
            RiskClassifier::breakpoints(
                "Healthy",
                [(20.0, "Mild"), (40.0, "Moderate"), (60.0, "Severe")],
            )
            .unwrap(),
        );
        let input = RawInput::Positional(vec![0.1; 18]);
        let first = d.infer(&input, "Model").unwrap();
        let second = d.infer(&input, "Model").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.category, "Moderate");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
