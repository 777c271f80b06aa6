//! Artifact store
//!
//! Loads one domain directory into a ready [`InferenceDispatcher`]:
//! feature manifest, preprocessing steps, label table and every model in
//! the domain's table. Any missing, corrupt or incompatible file fails the
//! whole domain.

use crate::backend::{Backend, Estimator, OnnxBackend};
use crate::domains::{DomainId, DomainSpec, FeatureSource, LabelSource, ModelSpec, PolicySpec, CHECKSUM_FILE};
use crate::error::ArtifactError;
use crate::observability::StructuredLogger;
use crate::predictor::{
    adapter_for, FeatureSchema, InferenceDispatcher, ModelRegistry, Preprocessor, RiskClassifier,
    TransformStep,
};
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Root directory holding one subdirectory per domain
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn domain_dir(&self, id: DomainId) -> PathBuf {
        self.root.join(id.spec().directory)
    }

    /// Feature schema of one domain, reading its manifest when it has one
    pub fn feature_schema(&self, id: DomainId) -> Result<FeatureSchema, ArtifactError> {
        let spec = id.spec();
        match spec.features {
            FeatureSource::Manifest(_) => DomainDir::open(self.domain_dir(id))?.schema(spec),
            _ => DomainDir::detached(self.domain_dir(id)).schema(spec),
        }
    }

    /// Load and validate every artifact of one domain
    pub fn load_domain(
        &self,
        id: DomainId,
        logger: &StructuredLogger,
    ) -> Result<InferenceDispatcher, ArtifactError> {
        let start = Instant::now();
        let spec = id.spec();
        let dir = DomainDir::open(self.domain_dir(id))?;

        let schema = dir.schema(spec)?;
        let preprocessor = dir.preprocessor(spec)?;
        let model_arity = preprocessor
            .as_ref()
            .map_or(schema.arity(), Preprocessor::output_arity);
        let labels = dir.labels(spec)?;

        let mut registry = ModelRegistry::new();
        for model in spec.models {
            let backend = dir.backend(model, model_arity)?;
            debug!(
                domain = %id,
                model = model.name,
                family = backend.family(),
                "Loaded model artifact"
            );
            registry
                .register(adapter_for(
                    model.name,
                    model.kind,
                    model.positive_class,
                    backend,
                    labels.clone(),
                ))
                .map_err(|reason| ArtifactError::incompatible(id.as_str(), reason))?;
        }

        let classifier = RiskClassifier::from_spec(&spec.policy)
            .map_err(|reason| ArtifactError::incompatible(id.as_str(), reason))?;
        let arity = schema.arity();
        let dispatcher =
            InferenceDispatcher::new(id.as_str(), schema, preprocessor, registry, classifier)
                .map_err(|reason| ArtifactError::incompatible(id.as_str(), reason))?
                .with_logger(logger.clone());

        logger.log_domain_loaded(
            id.as_str(),
            dispatcher.registry().len(),
            arity,
            start.elapsed().as_millis(),
        );
        Ok(dispatcher)
    }
}

/// One domain directory with its optional checksum manifest
struct DomainDir {
    path: PathBuf,
    checksums: Option<BTreeMap<String, String>>,
}

impl DomainDir {
    fn open(path: PathBuf) -> Result<Self, ArtifactError> {
        if !path.is_dir() {
            return Err(ArtifactError::Missing(path));
        }

        let manifest = path.join(CHECKSUM_FILE);
        let checksums = if manifest.is_file() {
            let bytes = std::fs::read(&manifest).map_err(|source| ArtifactError::Io {
                path: manifest.clone(),
                source,
            })?;
            let map: BTreeMap<String, String> = serde_json::from_slice(&bytes)
                .map_err(|source| ArtifactError::Parse {
                    path: manifest.clone(),
                    source,
                })?;
            info!(path = %manifest.display(), files = map.len(), "Verifying artifact checksums");
            Some(map)
        } else {
            None
        };

        Ok(Self { path, checksums })
    }

    /// Handle for catalog-only lookups that never touch the disk
    fn detached(path: PathBuf) -> Self {
        Self {
            path,
            checksums: None,
        }
    }

    /// Read a file, verifying it against the manifest when listed
    fn read(&self, file: &str) -> Result<Vec<u8>, ArtifactError> {
        let path = self.path.join(file);
        if !path.is_file() {
            return Err(ArtifactError::Missing(path));
        }
        let bytes = std::fs::read(&path).map_err(|source| ArtifactError::Io {
            path: path.clone(),
            source,
        })?;

        if let Some(expected) = self.checksums.as_ref().and_then(|c| c.get(file)) {
            let actual = compute_checksum(&bytes);
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(ArtifactError::Checksum {
                    path,
                    expected: expected.clone(),
                    actual,
                });
            }
        }
        Ok(bytes)
    }

    fn json<T: DeserializeOwned>(&self, file: &str) -> Result<T, ArtifactError> {
        let bytes = self.read(file)?;
        serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Parse {
            path: self.path.join(file),
            source,
        })
    }

    fn schema(&self, spec: &DomainSpec) -> Result<FeatureSchema, ArtifactError> {
        let schema = match spec.features {
            FeatureSource::Fixed(names) => FeatureSchema::new(names.iter().copied()),
            FeatureSource::Positional(arity) => FeatureSchema::positional(arity),
            FeatureSource::Manifest(file) => {
                let names: Vec<String> = self.json(file)?;
                if names.is_empty() {
                    return Err(ArtifactError::invalid(self.path.join(file), "empty feature list"));
                }
                let mut seen = std::collections::BTreeSet::new();
                if let Some(dup) = names.iter().find(|n| !seen.insert(n.as_str())) {
                    return Err(ArtifactError::invalid(
                        self.path.join(file),
                        format!("duplicate feature '{}'", dup),
                    ));
                }
                FeatureSchema::new(names)
            }
        };
        Ok(schema.with_target_columns(spec.target_columns.iter().copied()))
    }

    fn preprocessor(&self, spec: &DomainSpec) -> Result<Option<Preprocessor>, ArtifactError> {
        if spec.preprocessing.is_empty() {
            return Ok(None);
        }
        let steps = spec
            .preprocessing
            .iter()
            .map(|file| self.json::<TransformStep>(file))
            .collect::<Result<Vec<_>, _>>()?;
        Preprocessor::new(steps)
            .map(Some)
            .map_err(|reason| ArtifactError::invalid(&self.path, reason))
    }

    fn labels(&self, spec: &DomainSpec) -> Result<Arc<[String]>, ArtifactError> {
        match spec.policy {
            PolicySpec::Breakpoints { .. } => Ok(Arc::from(Vec::new())),
            PolicySpec::Labels(LabelSource::Fixed(labels)) => {
                Ok(labels.iter().map(|l| l.to_string()).collect())
            }
            PolicySpec::Labels(LabelSource::Artifact(file)) => {
                let labels: Vec<String> = self.json(file)?;
                if labels.is_empty() {
                    return Err(ArtifactError::invalid(self.path.join(file), "empty label table"));
                }
                Ok(labels.into())
            }
        }
    }

    fn backend(&self, model: &ModelSpec, arity: usize) -> Result<Box<dyn Backend>, ArtifactError> {
        let path = self.path.join(model.file);
        let backend: Box<dyn Backend> = if model.file.ends_with(".onnx") {
            let bytes = self.read(model.file)?;
            let onnx = OnnxBackend::from_bytes(&bytes, arity, model.outputs).map_err(|e| {
                ArtifactError::Onnx {
                    path: path.clone(),
                    reason: format!("{:#}", e),
                }
            })?;
            Box::new(onnx)
        } else {
            let estimator: Estimator = self.json(model.file)?;
            estimator
                .validate()
                .map_err(|reason| ArtifactError::invalid(&path, reason))?;
            Box::new(estimator)
        };

        if backend.input_arity() != arity {
            return Err(ArtifactError::invalid(
                path,
                format!(
                    "model expects {} inputs, pipeline produces {}",
                    backend.input_arity(),
                    arity
                ),
            ));
        }
        Ok(backend)
    }
}
