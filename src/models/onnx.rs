//! ONNX classifier backend (enabled with the `onnx` feature).
//!
//! Handles classifiers exported with skl2onnx: a `label` output plus a
//! probabilities output that is either a `[batch, classes]` tensor or a
//! `seq(map(int64, float))`.

use crate::error::{ArtifactError, PredictionError};
use crate::models::estimator::Predictor;
use crate::types::prediction::Label;
use ort::memory::Allocator;
use ort::session::{builder::GraphOptimizationLevel, Session, SessionOutputs};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, DynValue, Tensor};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// ONNX Runtime session wrapped as a [`Predictor`]
pub struct OnnxClassifier {
    name: String,
    /// Running a session needs exclusive access
    session: Mutex<Session>,
    input_name: String,
    label_output: String,
    proba_output: Option<String>,
}

impl OnnxClassifier {
    /// Load a classifier from an `.onnx` file
    pub fn load(path: &Path, name: &str, threads: usize) -> Result<Self, ArtifactError> {
        let onnx_err = |e: &dyn std::fmt::Display| ArtifactError::Onnx {
            path: path.to_path_buf(),
            message: e.to_string(),
        };

        info!(model = %name, path = %path.display(), threads = threads, "Loading ONNX model");

        let session = Session::builder()
            .map_err(|e| onnx_err(&e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| onnx_err(&e))?
            .with_intra_threads(threads)
            .map_err(|e| onnx_err(&e))?
            .commit_from_file(path)
            .map_err(|e| onnx_err(&e))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let label_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("label"))
            .or_else(|| session.outputs.first())
            .map(|o| o.name.clone())
            .ok_or_else(|| ArtifactError::invalid(path, "model has no outputs"))?;

        let proba_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .map(|o| o.name.clone());

        info!(
            model = %name,
            input = %input_name,
            label = %label_output,
            probabilities = ?proba_output,
            "ONNX model loaded"
        );

        Ok(Self {
            name: name.to_string(),
            session: Mutex::new(session),
            input_name,
            label_output,
            proba_output,
        })
    }

    /// Run the session on one row and hand the outputs to `extract`
    fn run<T>(
        &self,
        features: &[f64],
        extract: impl FnOnce(&SessionOutputs<'_>) -> Result<T, PredictionError>,
    ) -> Result<T, PredictionError> {
        let row: Vec<f32> = features.iter().map(|&v| v as f32).collect();
        let shape = vec![1_i64, row.len() as i64];
        let input_tensor = Tensor::from_array((shape, row)).map_err(runtime)?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| PredictionError::Runtime(format!("session lock poisoned: {}", e)))?;
        let outputs = session
            .run(ort::inputs![&self.input_name => input_tensor])
            .map_err(runtime)?;

        extract(&outputs)
    }

    fn extract_label(&self, outputs: &SessionOutputs<'_>) -> Result<Label, PredictionError> {
        let output = outputs
            .get(&self.label_output)
            .ok_or_else(|| PredictionError::EmptyOutput(self.label_output.clone()))?;
        let (_, data) = output.try_extract_tensor::<i64>().map_err(runtime)?;
        let label = data
            .first()
            .copied()
            .ok_or_else(|| PredictionError::EmptyOutput(self.label_output.clone()))?;
        debug!(model = %self.name, label = label, "ONNX label");
        Ok(Label::Int(label))
    }
}

impl Predictor for OnnxClassifier {
    fn predict(&self, features: &[f64]) -> Result<Label, PredictionError> {
        self.run(features, |outputs| self.extract_label(outputs))
    }

    fn predict_proba(&self, features: &[f64]) -> Option<Result<Vec<f64>, PredictionError>> {
        let proba_output = self.proba_output.as_ref()?;
        Some(self.run(features, |outputs| {
            let output = outputs
                .get(proba_output)
                .ok_or_else(|| PredictionError::EmptyOutput(proba_output.clone()))?;
            extract_probabilities(output)
        }))
    }

    /// Both outputs from a single session run
    fn predict_with_proba(&self, features: &[f64]) -> Result<(Label, Option<Vec<f64>>), PredictionError> {
        self.run(features, |outputs| {
            let label = self.extract_label(outputs)?;
            let probabilities = match &self.proba_output {
                Some(name) => {
                    let output = outputs
                        .get(name)
                        .ok_or_else(|| PredictionError::EmptyOutput(name.clone()))?;
                    Some(extract_probabilities(output)?)
                }
                None => None,
            };
            Ok((label, probabilities))
        })
    }

    fn kind(&self) -> &'static str {
        "onnx"
    }
}

/// Class probabilities for the first row, from a tensor or a seq(map) output
fn extract_probabilities(output: &DynValue) -> Result<Vec<f64>, PredictionError> {
    if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
        let classes = shape.last().copied().unwrap_or(data.len() as i64).max(1) as usize;
        return Ok(data.iter().take(classes).map(|&p| p as f64).collect());
    }

    let dtype = output.dtype();
    if !DynSequenceValueType::can_downcast(&dtype) {
        return Err(PredictionError::Runtime(format!(
            "unsupported probability output type {:?}",
            dtype
        )));
    }

    let allocator = Allocator::default();
    let sequence = output
        .downcast_ref::<DynSequenceValueType>()
        .map_err(runtime)?;
    let maps = sequence
        .try_extract_sequence::<DynMapValueType>(&allocator)
        .map_err(runtime)?;
    let first = maps
        .first()
        .ok_or_else(|| PredictionError::EmptyOutput("empty probability sequence".to_string()))?;

    let mut pairs = first.try_extract_key_values::<i64, f32>().map_err(runtime)?;
    pairs.sort_by_key(|(class, _)| *class);
    Ok(pairs.into_iter().map(|(_, p)| p as f64).collect())
}

fn runtime(e: impl std::fmt::Display) -> PredictionError {
    PredictionError::Runtime(e.to_string())
}
