//! Type definitions for request input and prediction output

pub mod input;
pub mod prediction;

pub use input::{RawInput, REQUIRED_FIELDS};
pub use prediction::{Label, PredictionReport, PredictionResult};
