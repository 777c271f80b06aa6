//! Named model registry
//!
//! Built once per domain from its fixed model table and never mutated
//! afterwards. Iteration follows display order.

use super::ModelAdapter;
use crate::error::PredictError;

#[derive(Default)]
pub struct ModelRegistry {
    adapters: Vec<Box<dyn ModelAdapter>>,
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an adapter; display names must be unique
    pub fn register(&mut self, adapter: Box<dyn ModelAdapter>) -> Result<(), String> {
        if self.adapters.iter().any(|a| a.name() == adapter.name()) {
            return Err(format!("model '{}' registered twice", adapter.name()));
        }
        self.adapters.push(adapter);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&dyn ModelAdapter, PredictError> {
        self.adapters
            .iter()
            .find(|a| a.name() == name)
            .map(|a| a.as_ref())
            .ok_or_else(|| PredictError::UnknownModel(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.adapters.iter().map(|a| a.name())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn ModelAdapter> {
        self.adapters.iter().map(|a| a.as_ref())
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BackendKind, Score};

    struct Named(&'static str);

    impl ModelAdapter for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn kind(&self) -> BackendKind {
            BackendKind::RawScoreRegressor
        }

        fn input_arity(&self) -> usize {
            1
        }

        fn predict(&self, _: &[f32]) -> Result<Score, PredictError> {
            Ok(Score::regression(0.0))
        }
    }

    #[test]
    fn test_lookup_by_display_name() {
        let mut registry = ModelRegistry::new();
        registry.register(Box::new(Named("SVM"))).unwrap();
        registry.register(Box::new(Named("KNN"))).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("KNN").unwrap().name(), "KNN");
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["SVM", "KNN"]);

        let err = registry.get("svm").err().unwrap();
        assert!(matches!(err, PredictError::UnknownModel(name) if name == "svm"));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut registry = ModelRegistry::new();
        registry.register(Box::new(Named("SVM"))).unwrap();
        assert!(registry.register(Box::new(Named("SVM"))).is_err());
    }
}
