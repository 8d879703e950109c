//! Ethereum account fraud screening web service
//!
//! Loads classifiers exported by the offline training pipeline, aligns and
//! scales submitted account features, and runs every loaded model on each
//! request, isolating per-model failures.

pub mod artifacts;
pub mod config;
pub mod error;
pub mod features;
pub mod metrics;
pub mod models;
pub mod types;
pub mod web;

pub use artifacts::ArtifactStore;
pub use config::AppConfig;
pub use features::FeatureAligner;
pub use models::inference::InferenceEngine;
pub use types::{PredictionReport, PredictionResult, RawInput};
pub use web::{router, AppContext, SharedContext};
