//! Classifier artifact loader

use crate::error::ArtifactError;
use crate::models::estimator::{Estimator, Predictor};
use crate::models::registry::{ModelHandle, ModelRegistry};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Model names looked up when none are configured
pub const DEFAULT_MODEL_NAMES: [&str; 3] = ["SVM", "KNN", "LogisticRegression"];

/// File name suffix shared by every exported model artifact
const ARTIFACT_SUFFIX: &str = "_best";

/// What happened when a single model artifact was attempted
#[derive(Debug)]
pub enum LoadOutcome {
    /// Artifact found and registered
    Loaded { path: PathBuf, kind: &'static str },
    /// No artifact exists for this model
    Missing { path: PathBuf },
    /// An artifact exists in a format this build cannot load
    Unsupported { path: PathBuf, reason: &'static str },
    /// Artifact exists but could not be used
    Failed { error: ArtifactError },
}

impl LoadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded { .. })
    }
}

impl fmt::Display for LoadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadOutcome::Loaded { path, kind } => write!(f, "loaded {} from {}", kind, path.display()),
            LoadOutcome::Missing { path } => write!(f, "not found at {}", path.display()),
            LoadOutcome::Unsupported { path, reason } => write!(f, "skipped {}: {}", path.display(), reason),
            LoadOutcome::Failed { error } => write!(f, "failed: {}", error),
        }
    }
}

/// Registry plus the per-model outcome of building it
#[derive(Debug)]
pub struct LoadReport {
    pub registry: ModelRegistry,
    pub outcomes: Vec<(String, LoadOutcome)>,
}

/// Loader for exported classifier artifacts
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    #[cfg_attr(not(feature = "onnx"), allow(dead_code))]
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with default settings (1 thread)
    pub fn new() -> Self {
        Self::with_threads(1)
    }

    /// Create a new model loader with specified number of ONNX threads
    pub fn with_threads(onnx_threads: usize) -> Self {
        Self {
            onnx_threads: onnx_threads.max(1),
        }
    }

    /// Load a single native (JSON) estimator from file
    pub fn load_estimator<P: AsRef<Path>>(&self, path: P) -> Result<Estimator, ArtifactError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let estimator: Estimator =
            serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        estimator
            .validate()
            .map_err(|reason| ArtifactError::invalid(path, reason))?;
        Ok(estimator)
    }

    /// Attempt one model by name, trying each supported artifact format
    pub fn load_model<P: AsRef<Path>>(&self, models_dir: P, name: &str) -> (Option<ModelHandle>, LoadOutcome) {
        let models_dir = models_dir.as_ref();
        let json_path = models_dir.join(format!("{}{}.json", name, ARTIFACT_SUFFIX));

        info!(model = %name, path = %json_path.display(), "Checking for model");
        if json_path.exists() {
            return match self.load_estimator(&json_path) {
                Ok(estimator) => {
                    let kind = estimator.kind();
                    let outcome = LoadOutcome::Loaded { path: json_path, kind };
                    (Some(Arc::new(estimator) as ModelHandle), outcome)
                }
                Err(error) => (None, LoadOutcome::Failed { error }),
            };
        }

        let onnx_path = models_dir.join(format!("{}{}.onnx", name, ARTIFACT_SUFFIX));

        #[cfg(not(feature = "onnx"))]
        {
            if onnx_path.exists() {
                let reason = "ONNX support is not enabled in this build (feature `onnx`)";
                return (None, LoadOutcome::Unsupported { path: onnx_path, reason });
            }
        }

        #[cfg(feature = "onnx")]
        {
            if onnx_path.exists() {
                return match crate::models::onnx::OnnxClassifier::load(&onnx_path, name, self.onnx_threads) {
                    Ok(model) => {
                        let kind = model.kind();
                        let outcome = LoadOutcome::Loaded { path: onnx_path, kind };
                        (Some(Arc::new(model) as ModelHandle), outcome)
                    }
                    Err(error) => (None, LoadOutcome::Failed { error }),
                };
            }
        }

        (None, LoadOutcome::Missing { path: json_path })
    }

    /// Load every named model found in a directory.
    ///
    /// Missing or broken artifacts are logged and skipped; an empty registry
    /// is a valid result.
    pub fn load_all_models<P, S>(&self, models_dir: P, names: &[S]) -> LoadReport
    where
        P: AsRef<Path>,
        S: AsRef<str>,
    {
        let models_dir = models_dir.as_ref();
        let mut registry = ModelRegistry::new();
        let mut outcomes = Vec::with_capacity(names.len());

        for name in names {
            let name = name.as_ref();
            let (model, outcome) = self.load_model(models_dir, name);

            match (&outcome, model) {
                (LoadOutcome::Loaded { path, kind }, Some(model)) => {
                    info!(model = %name, kind = %kind, path = %path.display(), "Model loaded successfully");
                    registry.insert(name, model);
                }
                (LoadOutcome::Failed { error }, _) => {
                    warn!(model = %name, error = %error, "Failed to load model, skipping");
                }
                (LoadOutcome::Unsupported { path, reason }, _) => {
                    warn!(model = %name, path = %path.display(), reason = %reason, "Found model artifact but cannot load it");
                }
                (LoadOutcome::Missing { path }, _) => {
                    warn!(model = %name, path = %path.display(), "Model file not found");
                }
                _ => {}
            }
            outcomes.push((name.to_string(), outcome));
        }

        if registry.is_empty() {
            warn!(dir = %models_dir.display(), "No models loaded; predictions will be empty");
        } else {
            info!(
                count = registry.len(),
                "Loaded {} models from {}",
                registry.len(),
                models_dir.display()
            );
        }

        LoadReport { registry, outcomes }
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}
