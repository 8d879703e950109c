//! Registry of loaded classifiers

use crate::models::estimator::Predictor;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Shared handle to a loaded classifier
pub type ModelHandle = Arc<dyn Predictor>;

/// Loaded models keyed by name, in load order.
///
/// Built once at startup and never mutated afterwards, so it can be shared
/// across request handlers without locking.
#[derive(Clone, Default)]
pub struct ModelRegistry {
    models: IndexMap<String, ModelHandle>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from `(name, model)` pairs, keeping their order
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, ModelHandle)>,
    {
        Self {
            models: entries.into_iter().collect(),
        }
    }

    pub(crate) fn insert(&mut self, name: impl Into<String>, model: ModelHandle) {
        self.models.insert(name.into(), model);
    }

    pub fn get(&self, name: &str) -> Option<&ModelHandle> {
        self.models.get(name)
    }

    /// Iterate models in load order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ModelHandle)> {
        self.models.iter().map(|(name, model)| (name.as_str(), model))
    }

    /// Get loaded model names
    pub fn names(&self) -> Vec<String> {
        self.models.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.models.iter().map(|(name, model)| (name, model.kind())))
            .finish()
    }
}
