//! HTTP surface: index page, result files, prediction form and health.

pub mod error;
pub mod flash;
pub mod handlers;
pub mod page;

pub use error::WebError;
pub use flash::Flash;
pub use page::{IndexView, PageRenderer};

use crate::artifacts::ArtifactStore;
use crate::config::AppConfig;
use crate::metrics::ServiceMetrics;
use crate::models::inference::InferenceEngine;
use anyhow::{Context, Result};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tracing::info;

/// State shared by every handler
pub struct AppContext {
    pub config: AppConfig,
    pub store: ArtifactStore,
    pub engine: InferenceEngine,
    pub pages: PageRenderer,
    pub metrics: Arc<ServiceMetrics>,
}

pub type SharedContext = Arc<AppContext>;

impl AppContext {
    /// Load artifacts from the configured export root and compile templates
    pub fn build(config: AppConfig) -> Result<Self> {
        let store = ArtifactStore::new(&config.artifacts.export_root);
        info!(root = %store.root().display(), "Loading artifacts");

        let metrics = Arc::new(ServiceMetrics::new());
        let engine = InferenceEngine::load(&store, &config).with_metrics(metrics);
        Self::from_parts(config, store, engine)
    }

    /// Assemble a context around an already-built engine
    pub fn from_parts(config: AppConfig, store: ArtifactStore, engine: InferenceEngine) -> Result<Self> {
        let pages = PageRenderer::new().context("Failed to compile page templates")?;
        let metrics = Arc::clone(engine.metrics());
        Ok(Self {
            config,
            store,
            engine,
            pages,
            metrics,
        })
    }

    pub fn is_production(&self) -> bool {
        self.config.server.production
    }

    /// Index page state without messages or results
    pub fn index_view(&self) -> IndexView {
        IndexView::new(
            self.store.list_results(),
            self.engine.model_names(),
            self.store.performance_table(),
        )
    }

    /// Render the index page with the given status
    pub fn render(&self, view: &IndexView, status: StatusCode) -> Result<Response, WebError> {
        let html = self
            .pages
            .render_index(view)
            .map_err(|e| WebError::internal(e, self.is_production()))?;
        Ok((status, Html(html)).into_response())
    }
}

/// Build the application router
pub fn router(ctx: SharedContext) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/results/*filename", get(handlers::serve_result))
        .route("/predict", post(handlers::predict))
        .route("/health", get(handlers::health))
        .with_state(ctx)
}
