//! Standard scaler exported from the training pipeline

use crate::error::ScaleError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Per-feature standardization `(x - mean) / scale`.
///
/// An exported but never fitted scaler carries no `mean`; such a scaler is
/// treated as absent and leaves input untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    #[serde(default)]
    pub mean: Option<Vec<f64>>,
    #[serde(default)]
    pub scale: Option<Vec<f64>>,
    #[serde(default = "default_true")]
    pub with_mean: bool,
    #[serde(default = "default_true")]
    pub with_std: bool,
}

fn default_true() -> bool {
    true
}

impl StandardScaler {
    /// Fitted scaler with the given statistics
    pub fn fitted(mean: Vec<f64>, scale: Vec<f64>) -> Self {
        Self {
            mean: Some(mean),
            scale: Some(scale),
            with_mean: true,
            with_std: true,
        }
    }

    /// Whether the scaler learned statistics from training data
    pub fn is_fitted(&self) -> bool {
        self.mean.is_some()
    }

    /// Number of features the scaler was fitted on
    pub fn n_features(&self) -> Option<usize> {
        self.mean.as_ref().map(Vec::len)
    }

    /// Check internal consistency after deserialization
    pub fn validate(&self) -> Result<(), String> {
        if let (Some(mean), Some(scale)) = (&self.mean, &self.scale) {
            if mean.len() != scale.len() {
                return Err(format!(
                    "mean has {} entries but scale has {}",
                    mean.len(),
                    scale.len()
                ));
            }
        }
        Ok(())
    }

    /// Standardize one row
    pub fn transform(&self, features: &[f64]) -> Result<Vec<f64>, ScaleError> {
        let Some(mean) = &self.mean else {
            return Ok(features.to_vec());
        };

        if mean.len() != features.len() {
            return Err(ScaleError::WidthMismatch {
                expected: mean.len(),
                actual: features.len(),
            });
        }

        let scaled = features
            .iter()
            .enumerate()
            .map(|(i, &x)| {
                let centered = if self.with_mean { x - mean[i] } else { x };
                match (&self.scale, self.with_std) {
                    (Some(scale), true) => {
                        let s = scale.get(i).copied().unwrap_or(1.0);
                        // Constant features are exported with zero scale
                        if s == 0.0 {
                            centered
                        } else {
                            centered / s
                        }
                    }
                    _ => centered,
                }
            })
            .collect();

        Ok(scaled)
    }
}

/// Apply `scaler` when present and fitted, otherwise pass the vector through.
pub fn scale(features: Vec<f64>, scaler: Option<&StandardScaler>) -> Result<Vec<f64>, ScaleError> {
    match scaler {
        Some(scaler) if scaler.is_fitted() => {
            debug!("Scaling input with loaded scaler");
            scaler.transform(&features)
        }
        _ => {
            debug!("No fitted scaler loaded, using raw values");
            Ok(features)
        }
    }
}
