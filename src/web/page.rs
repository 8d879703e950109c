//! Index page rendering

use crate::artifacts::PerformanceTable;
use crate::types::prediction::{PredictionReport, PredictionResult};
use crate::types::REQUIRED_FIELDS;
use minijinja::Environment;
use serde::Serialize;
use std::collections::HashMap;

const INDEX_TEMPLATE: &str = include_str!("../../templates/index.html");

/// Compiled page templates
pub struct PageRenderer {
    env: Environment<'static>,
}

impl PageRenderer {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template("index.html", INDEX_TEMPLATE)?;
        Ok(Self { env })
    }

    pub fn render_index(&self, view: &IndexView) -> Result<String, minijinja::Error> {
        self.env.get_template("index.html")?.render(view)
    }
}

/// A message shown above the form
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    /// Bootstrap alert class: warning, danger, info
    pub category: String,
    pub text: String,
}

impl Message {
    pub fn new(category: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            text: text.into(),
        }
    }
}

/// Everything the index template renders
#[derive(Debug, Serialize)]
pub struct IndexView {
    /// Result files available under /results
    pub files: Vec<String>,
    /// Loaded model names
    pub models: Vec<String>,
    /// Form inputs, in display order
    pub fields: Vec<&'static str>,
    /// Previously submitted values, echoed back into the form
    pub form: HashMap<String, String>,
    pub messages: Vec<Message>,
    pub perf_table: Option<PerformanceTable>,
    pub results: Option<ResultsView>,
}

impl IndexView {
    pub fn new(files: Vec<String>, models: Vec<String>, perf_table: Option<PerformanceTable>) -> Self {
        Self {
            files,
            models,
            fields: REQUIRED_FIELDS.to_vec(),
            form: HashMap::new(),
            messages: Vec::new(),
            perf_table,
            results: None,
        }
    }
}

/// Prediction report flattened for display
#[derive(Debug, Clone, Serialize)]
pub struct ResultsView {
    pub request_id: String,
    pub created_at: String,
    pub rows: Vec<ResultRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub model: String,
    pub prediction: Option<String>,
    pub probabilities: Option<String>,
    pub error: Option<String>,
}

impl From<&PredictionReport> for ResultsView {
    fn from(report: &PredictionReport) -> Self {
        let rows = report
            .results
            .iter()
            .map(|(model, result)| match result {
                PredictionResult::Success {
                    predictions,
                    probabilities,
                } => ResultRow {
                    model: model.clone(),
                    prediction: Some(
                        predictions
                            .iter()
                            .map(ToString::to_string)
                            .collect::<Vec<_>>()
                            .join(", "),
                    ),
                    probabilities: probabilities
                        .as_ref()
                        .and_then(|rows| rows.first())
                        .map(|row| format_probabilities(row)),
                    error: None,
                },
                PredictionResult::Failed { error } => ResultRow {
                    model: model.clone(),
                    prediction: None,
                    probabilities: None,
                    error: Some(error.clone()),
                },
            })
            .collect();

        Self {
            request_id: report.request_id.to_string(),
            created_at: report.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            rows,
        }
    }
}

fn format_probabilities(row: &[f64]) -> String {
    let parts: Vec<String> = row.iter().map(|p| format!("{:.4}", p)).collect();
    format!("[{}]", parts.join(", "))
}
