//! Error types for artifact loading, request input and model prediction.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to read or validate an artifact from the export directory.
#[derive(Error, Debug)]
pub enum ArtifactError {
    /// Artifact file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Artifact file is not valid JSON for the expected shape
    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Artifact parsed but its contents are inconsistent
    #[error("invalid artifact {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },

    /// ONNX Runtime rejected the model
    #[cfg(feature = "onnx")]
    #[error("failed to load ONNX model {path}: {message}")]
    Onnx { path: PathBuf, message: String },
}

impl ArtifactError {
    pub(crate) fn invalid(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Problems with a submitted form.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    /// One or more required fields were not submitted
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    /// A submitted field is not a number
    #[error("field {field} must be a number, got {value:?}")]
    InvalidNumber { field: String, value: String },
}

/// Scaler could not be applied to an aligned vector.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScaleError {
    #[error("scaler expects {expected} features, input has {actual}")]
    WidthMismatch { expected: usize, actual: usize },
}

/// A single model failed to produce a prediction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictionError {
    /// Input width does not match what the model was trained on
    #[error("model expects {expected} features, input has {actual}")]
    WidthMismatch { expected: usize, actual: usize },

    /// Model produced no usable output
    #[error("model returned no output: {0}")]
    EmptyOutput(String),

    /// Model panicked while predicting
    #[error("model panicked: {0}")]
    Panicked(String),

    /// Runtime error from the underlying model engine
    #[error("{0}")]
    Runtime(String),
}
