//! Classifier artifacts and multi-model inference

pub mod estimator;
pub mod inference;
pub mod loader;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod registry;
pub mod scaler;

pub use estimator::{Estimator, Predictor};
pub use inference::{InferenceEngine, ScreeningError};
pub use loader::{LoadOutcome, ModelLoader};
pub use registry::{ModelHandle, ModelRegistry};
pub use scaler::StandardScaler;
