//! HTTP request handlers

use crate::error::InputError;
use crate::metrics::MetricsSnapshot;
use crate::models::inference::ScreeningError;
use crate::types::RawInput;
use crate::web::error::WebError;
use crate::web::flash::Flash;
use crate::web::page::{Message, ResultsView};
use crate::web::SharedContext;
use axum::{
    extract::{Form, Path, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// `healthy` with at least one model, `degraded` otherwise
    pub status: String,
    pub version: String,
    pub models: Vec<String>,
    pub artifacts: Vec<ArtifactStatus>,
    pub scaler_loaded: bool,
    pub feature_order: Vec<String>,
    pub metrics: MetricsSnapshot,
}

/// Startup load outcome for one configured model
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactStatus {
    pub model: String,
    pub loaded: bool,
    pub detail: String,
}

/// Index page; shows and clears any pending flash message
pub async fn index(State(ctx): State<SharedContext>, jar: CookieJar) -> Result<Response, WebError> {
    let (jar, flash) = Flash::take(jar);

    let mut view = ctx.index_view();
    if let Some(flash) = flash {
        view.messages.push(Message::new(flash.category(), flash.message()));
    }

    let response = ctx.render(&view, StatusCode::OK)?;
    Ok((jar, response).into_response())
}

/// Serve a file from the results directory
pub async fn serve_result(
    State(ctx): State<SharedContext>,
    Path(filename): Path<String>,
) -> Result<Response, WebError> {
    let Some(path) = ctx.store.resolve_result(&filename) else {
        debug!(file = %filename, "Result file not found");
        return Err(WebError::NotFound(filename));
    };

    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            Ok(([(CONTENT_TYPE, mime.to_string())], bytes).into_response())
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read result file");
            Err(WebError::NotFound(filename))
        }
    }
}

/// Screen one account submitted through the form
pub async fn predict(
    State(ctx): State<SharedContext>,
    jar: CookieJar,
    Form(fields): Form<HashMap<String, String>>,
) -> Result<Response, WebError> {
    let raw = RawInput::from(fields.clone());

    // KNN scans and ONNX sessions are CPU-bound
    let worker = Arc::clone(&ctx);
    let outcome = tokio::task::spawn_blocking(move || worker.engine.predict(&raw))
        .await
        .map_err(|e| WebError::internal(e, ctx.is_production()))?;

    match outcome {
        Ok(report) => {
            info!(
                request_id = %report.request_id,
                models = report.len(),
                failed = report.failed_count(),
                "Prediction served"
            );
            let mut view = ctx.index_view();
            view.form = fields;
            view.results = Some(ResultsView::from(&report));
            ctx.render(&view, StatusCode::OK)
        }
        Err(ScreeningError::Input(InputError::MissingFields(missing))) => {
            info!(missing = ?missing, "Rejected prediction with missing fields");
            let jar = Flash::MissingFields.store(jar);
            Ok((jar, Redirect::to("/")).into_response())
        }
        Err(ScreeningError::Input(e @ InputError::InvalidNumber { .. })) => {
            info!(error = %e, "Rejected prediction with invalid number");
            let mut view = ctx.index_view();
            view.form = fields;
            view.messages.push(Message::new("danger", e.to_string()));
            ctx.render(&view, StatusCode::UNPROCESSABLE_ENTITY)
        }
        Err(e @ ScreeningError::Scale(_)) => Err(WebError::internal(e, ctx.is_production())),
    }
}

/// Health check handler
pub async fn health(State(ctx): State<SharedContext>) -> Json<HealthResponse> {
    let models = ctx.engine.model_names();
    let status = if models.is_empty() { "degraded" } else { "healthy" };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        models,
        artifacts: ctx
            .engine
            .load_outcomes()
            .iter()
            .map(|(model, outcome)| ArtifactStatus {
                model: model.clone(),
                loaded: outcome.is_loaded(),
                detail: outcome.to_string(),
            })
            .collect(),
        scaler_loaded: ctx.engine.scaler().is_some(),
        feature_order: ctx
            .engine
            .aligner()
            .feature_names()
            .into_iter()
            .map(str::to_string)
            .collect(),
        metrics: ctx.metrics.snapshot(),
    })
}
