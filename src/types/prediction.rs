//! Prediction output structures

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Class label produced by a classifier.
///
/// Training exports either integer classes (`0`/`1`) or string classes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Label {
    Int(i64),
    Text(String),
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Int(v) => write!(f, "{}", v),
            Label::Text(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for Label {
    fn from(v: i64) -> Self {
        Label::Int(v)
    }
}

impl From<&str> for Label {
    fn from(v: &str) -> Self {
        Label::Text(v.to_string())
    }
}

/// Outcome of running one model on one input row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictionResult {
    /// Model produced a label and, when it supports them, class probabilities
    Success {
        predictions: Vec<Label>,
        probabilities: Option<Vec<Vec<f64>>>,
    },
    /// Model failed; other models are unaffected
    Failed { error: String },
}

impl PredictionResult {
    /// Build a single-row success result
    pub fn single(label: Label, probabilities: Option<Vec<f64>>) -> Self {
        PredictionResult::Success {
            predictions: vec![label],
            probabilities: probabilities.map(|p| vec![p]),
        }
    }

    /// Build a failure result from any displayable error
    pub fn failed(error: impl fmt::Display) -> Self {
        PredictionResult::Failed {
            error: error.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, PredictionResult::Failed { .. })
    }
}

/// Per-model results for one screening request, in registry order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionReport {
    /// Request identifier, also attached to log events
    pub request_id: Uuid,
    /// When the report was produced
    pub created_at: DateTime<Utc>,
    /// Model name to result
    pub results: IndexMap<String, PredictionResult>,
}

impl PredictionReport {
    /// Create an empty report with a fresh request id
    pub fn new() -> Self {
        Self::with_request_id(Uuid::new_v4())
    }

    pub fn with_request_id(request_id: Uuid) -> Self {
        Self {
            request_id,
            created_at: Utc::now(),
            results: IndexMap::new(),
        }
    }

    /// Record the result for `model`
    pub fn insert(&mut self, model: impl Into<String>, result: PredictionResult) {
        self.results.insert(model.into(), result);
    }

    pub fn get(&self, model: &str) -> Option<&PredictionResult> {
        self.results.get(model)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Number of models that failed
    pub fn failed_count(&self) -> usize {
        self.results.values().filter(|r| r.is_error()).count()
    }
}

impl Default for PredictionReport {
    fn default() -> Self {
        Self::new()
    }
}
