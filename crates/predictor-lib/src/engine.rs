//! Process-wide prediction engine
//!
//! Holds one dispatcher per enabled domain. Loading is all-or-nothing:
//! the first failing domain aborts startup.

use crate::artifacts::ArtifactStore;
use crate::domains::DomainId;
use crate::error::ArtifactError;
use crate::observability::{PredictorMetrics, StructuredLogger};
use crate::predictor::InferenceDispatcher;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::Instant;
use tracing::info;

static GLOBAL_ENGINE: OnceLock<PredictionEngine> = OnceLock::new();
static INIT_LOCK: Mutex<()> = Mutex::new(());

#[derive(Debug)]
pub struct PredictionEngine {
    root: PathBuf,
    dispatchers: BTreeMap<DomainId, InferenceDispatcher>,
}

impl PredictionEngine {
    /// Load every listed domain from `root`
    pub fn load(
        root: impl AsRef<Path>,
        domains: &[DomainId],
        logger: &StructuredLogger,
    ) -> Result<Self, ArtifactError> {
        let start = Instant::now();
        let store = ArtifactStore::new(root.as_ref());
        let metrics = PredictorMetrics::new();

        let mut dispatchers = BTreeMap::new();
        for id in domains {
            if dispatchers.contains_key(id) {
                continue;
            }
            let dispatcher = store.load_domain(*id, logger)?;
            metrics.set_models_loaded(id.as_str(), dispatcher.registry().len());
            dispatchers.insert(*id, dispatcher);
        }

        let elapsed = start.elapsed();
        metrics.observe_artifact_load(elapsed.as_secs_f64());
        info!(
            root = %store.root().display(),
            domains = dispatchers.len(),
            elapsed_ms = elapsed.as_millis(),
            "All artifacts loaded"
        );

        Ok(Self {
            root: store.root().to_path_buf(),
            dispatchers,
        })
    }

    /// Load once per process; later calls return the first engine
    pub fn init_global(
        root: impl AsRef<Path>,
        domains: &[DomainId],
        logger: &StructuredLogger,
    ) -> Result<&'static PredictionEngine, ArtifactError> {
        if let Some(engine) = GLOBAL_ENGINE.get() {
            return Ok(engine);
        }
        let _guard = INIT_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(engine) = GLOBAL_ENGINE.get() {
            return Ok(engine);
        }
        let engine = Self::load(root, domains, logger)?;
        Ok(GLOBAL_ENGINE.get_or_init(|| engine))
    }

    pub fn global() -> Option<&'static PredictionEngine> {
        GLOBAL_ENGINE.get()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dispatcher(&self, id: DomainId) -> Option<&InferenceDispatcher> {
        self.dispatchers.get(&id)
    }

    pub fn domains(&self) -> impl Iterator<Item = DomainId> + '_ {
        self.dispatchers.keys().copied()
    }

    pub fn model_count(&self) -> usize {
        self.dispatchers.values().map(|d| d.registry().len()).sum()
    }
}
