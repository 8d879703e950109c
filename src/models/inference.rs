//! Multi-model inference engine for account screening

use crate::artifacts::ArtifactStore;
use crate::config::AppConfig;
use crate::error::{InputError, PredictionError, ScaleError};
use crate::features::FeatureAligner;
use crate::metrics::ServiceMetrics;
use crate::models::estimator::Predictor;
use crate::models::loader::{LoadOutcome, ModelLoader};
use crate::models::registry::ModelRegistry;
use crate::models::scaler::{self, StandardScaler};
use crate::types::input::RawInput;
use crate::types::prediction::{PredictionReport, PredictionResult};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Request-level failure: no model was run
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScreeningError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error("could not scale input: {0}")]
    Scale(#[from] ScaleError),
}

/// Runs aligned, scaled input through every loaded classifier
pub struct InferenceEngine {
    /// Loaded classifiers in configured order
    registry: ModelRegistry,
    /// Fitted scaler, if one was exported
    scaler: Option<StandardScaler>,
    /// Form field to feature column mapping
    aligner: FeatureAligner,
    metrics: Arc<ServiceMetrics>,
    /// Per-model outcome of the startup load
    load_outcomes: Vec<(String, LoadOutcome)>,
}

impl InferenceEngine {
    /// Create an engine from already-loaded parts
    pub fn new(
        registry: ModelRegistry,
        scaler: Option<StandardScaler>,
        aligner: FeatureAligner,
    ) -> Self {
        Self {
            registry,
            scaler,
            aligner,
            metrics: Arc::new(ServiceMetrics::new()),
            load_outcomes: Vec::new(),
        }
    }

    /// Load models, scaler and feature order from the artifact store.
    ///
    /// Missing or unreadable artifacts shrink what is available but never
    /// prevent the engine from starting.
    pub fn load(store: &ArtifactStore, config: &AppConfig) -> Self {
        let loader = ModelLoader::with_threads(config.inference.onnx_threads);
        let report = loader.load_all_models(store.models_dir(), &config.artifacts.model_names);

        let scaler = store.load_scaler().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load scaler, using raw values");
            None
        });
        let expected = store.load_feature_names().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load feature names, using form field order");
            None
        });

        if expected.is_none() && scaler.as_ref().is_some_and(StandardScaler::is_fitted) {
            warn!(
                "Fitted scaler loaded without feature_names.json; \
                 columns are passed in form field order and may not match training order"
            );
        }

        let aligner = FeatureAligner::new(expected);
        info!(
            models = ?report.registry.names(),
            scaler = scaler.is_some(),
            features = ?aligner.feature_names(),
            "Inference engine initialized"
        );

        Self {
            registry: report.registry,
            scaler,
            aligner,
            metrics: Arc::new(ServiceMetrics::new()),
            load_outcomes: report.outcomes,
        }
    }

    /// Share a metrics collector with the rest of the service
    pub fn with_metrics(mut self, metrics: Arc<ServiceMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Get the number of loaded models
    pub fn model_count(&self) -> usize {
        self.registry.len()
    }

    /// Get loaded model names
    pub fn model_names(&self) -> Vec<String> {
        self.registry.names()
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn aligner(&self) -> &FeatureAligner {
        &self.aligner
    }

    pub fn scaler(&self) -> Option<&StandardScaler> {
        self.scaler.as_ref()
    }

    pub fn metrics(&self) -> &Arc<ServiceMetrics> {
        &self.metrics
    }

    pub fn load_outcomes(&self) -> &[(String, LoadOutcome)] {
        &self.load_outcomes
    }

    /// Align and scale one request's input
    pub fn prepare(&self, raw: &RawInput) -> Result<Vec<f64>, ScreeningError> {
        let aligned = self.aligner.align(raw)?;
        debug!(features = ?aligned, "Aligned input");
        Ok(scaler::scale(aligned, self.scaler.as_ref())?)
    }

    /// Validate, align, scale and dispatch one request
    pub fn predict(&self, raw: &RawInput) -> Result<PredictionReport, ScreeningError> {
        let features = self.prepare(raw).inspect_err(|_| self.metrics.record_rejection())?;
        self.metrics.record_prediction();
        Ok(self.dispatch(&features))
    }

    /// Run `features` through every loaded model
    pub fn dispatch(&self, features: &[f64]) -> PredictionReport {
        dispatch(features, &self.registry, Some(&*self.metrics))
    }
}

/// Run every registered model on one row.
///
/// Each model is isolated: an error or panic in one only affects that
/// model's entry.
pub fn dispatch(
    features: &[f64],
    registry: &ModelRegistry,
    metrics: Option<&ServiceMetrics>,
) -> PredictionReport {
    let mut report = PredictionReport::new();

    for (name, model) in registry.iter() {
        let start = Instant::now();
        let result = run_model(&**model, features);
        let elapsed = start.elapsed();

        match &result {
            PredictionResult::Success { predictions, probabilities } => debug!(
                request_id = %report.request_id,
                model = %name,
                predictions = ?predictions,
                probabilities = ?probabilities,
                elapsed_us = elapsed.as_micros(),
                "Model prediction"
            ),
            PredictionResult::Failed { error } => warn!(
                request_id = %report.request_id,
                model = %name,
                error = %error,
                "Model prediction failed"
            ),
        }

        if let Some(metrics) = metrics {
            metrics.record_model_call(name, elapsed, result.is_error());
        }
        report.insert(name, result);
    }

    report
}

/// Label then, if supported, probabilities; any failure becomes the model's result
fn run_model(model: &dyn Predictor, features: &[f64]) -> PredictionResult {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let (label, probabilities) = model.predict_with_proba(features)?;
        Ok::<_, PredictionError>(PredictionResult::single(label, probabilities))
    }));

    match outcome {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => PredictionResult::failed(e),
        Err(payload) => PredictionResult::failed(PredictionError::Panicked(panic_message(&*payload))),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
