//! End-to-end screening flow over a temporary export directory

use axum::body::to_bytes;
use axum::extract::{Form, Path, State};
use axum::http::header::{LOCATION, SET_COOKIE};
use axum::http::StatusCode;
use axum::response::Response;
use axum_extra::extract::cookie::CookieJar;
use eth_fraud_webapp::types::{Label, PredictionResult, RawInput};
use eth_fraud_webapp::web::handlers;
use eth_fraud_webapp::web::WebError;
use eth_fraud_webapp::{AppConfig, AppContext, ArtifactStore, SharedContext};
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;

const SVM: &str = r#"{
    "kind": "linear_svm",
    "classes": [0, 1],
    "coef": [[0.5, -0.5, 0.0]],
    "intercept": [0.0]
}"#;

const KNN: &str = r#"{
    "kind": "k_nearest_neighbors",
    "classes": [0, 1],
    "k": 1,
    "samples": [[0.0, 0.0, 0.0], [10.0, 10.0, 10.0]],
    "targets": [0, 1]
}"#;

const LOGISTIC: &str = r#"{
    "kind": "logistic_regression",
    "classes": [0, 1],
    "coef": [[1.0, 1.0, 1.0]],
    "intercept": [0.0]
}"#;

struct Export {
    dir: TempDir,
    store: ArtifactStore,
}

impl Export {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        for sub in [store.models_dir(), store.preprocessors_dir(), store.results_dir()] {
            std::fs::create_dir_all(sub).unwrap();
        }
        Self { dir, store }
    }

    fn model(&self, name: &str, body: &str) -> &Self {
        std::fs::write(self.store.models_dir().join(format!("{}_best.json", name)), body).unwrap();
        self
    }

    fn preprocessor(&self, file: &str, body: &str) -> &Self {
        std::fs::write(self.store.preprocessors_dir().join(file), body).unwrap();
        self
    }

    fn result(&self, file: &str, body: &str) -> &Self {
        std::fs::write(self.store.results_dir().join(file), body).unwrap();
        self
    }

    fn context(&self) -> SharedContext {
        let mut config = AppConfig::default();
        config.artifacts.export_root = self.dir.path().to_path_buf();
        Arc::new(AppContext::build(config).unwrap())
    }
}

fn form(values: &[(&str, &str)]) -> HashMap<String, String> {
    values
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn full_form() -> HashMap<String, String> {
    form(&[
        ("TxnCount", "5"),
        ("Balance", "120.5"),
        ("AvgGasUsed", "21000"),
        ("TokenTransfers", "2"),
        ("TotalEthReceived", "1.5"),
        ("TotalEthSent", "0.5"),
    ])
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_all_models_answer_with_feature_list() {
    let export = Export::new();
    export
        .model("SVM", SVM)
        .model("KNN", KNN)
        .model("LogisticRegression", LOGISTIC)
        .preprocessor("feature_names.json", r#"["Balance", "TxnCount", "NewFeature"]"#);
    let ctx = export.context();

    let raw = RawInput::from(full_form());
    assert_eq!(ctx.engine.prepare(&raw).unwrap(), vec![120.5, 5.0, 0.0]);

    let report = ctx.engine.predict(&raw).unwrap();
    let names: Vec<&str> = report.results.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["SVM", "KNN", "LogisticRegression"]);
    assert_eq!(report.failed_count(), 0);

    // 0.5 * 120.5 - 0.5 * 5.0 > 0
    assert_eq!(
        report.get("SVM"),
        Some(&PredictionResult::single(Label::Int(1), None))
    );
    match report.get("LogisticRegression") {
        Some(PredictionResult::Success { predictions, probabilities }) => {
            assert_eq!(predictions, &vec![Label::Int(1)]);
            let row = &probabilities.as_ref().unwrap()[0];
            assert!((row[0] + row[1] - 1.0).abs() < 1e-9);
        }
        other => panic!("unexpected result: {:?}", other),
    }

    let response = handlers::predict(State(ctx), CookieJar::new(), Form(full_form())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("KNN"));
    assert!(!html.contains("Error:"));
}

#[tokio::test]
async fn test_scaler_width_mismatch_fails_request() {
    let export = Export::new();
    export
        .model("LogisticRegression", LOGISTIC)
        .preprocessor("feature_names.json", r#"["Balance", "TxnCount", "NewFeature"]"#)
        .preprocessor("scaler.json", r#"{"mean": [0.0, 0.0], "scale": [1.0, 1.0]}"#);
    let ctx = export.context();

    let result = handlers::predict(State(ctx.clone()), CookieJar::new(), Form(full_form())).await;
    let response = match result {
        Err(e @ WebError::Internal { .. }) => axum::response::IntoResponse::into_response(e),
        other => panic!("expected internal error, got {:?}", other.map(|r| r.status())),
    };
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_text(response).await.contains("scaler expects 2 features"));
    assert_eq!(ctx.metrics.snapshot().predictions_served, 0);
}

#[tokio::test]
async fn test_missing_field_never_reaches_models() {
    let export = Export::new();
    export.model("LogisticRegression", LOGISTIC);
    let ctx = export.context();

    let mut submitted = full_form();
    submitted.remove("Balance");
    let response = handlers::predict(State(ctx.clone()), CookieJar::new(), Form(submitted)).await.unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get(LOCATION).unwrap(), "/");
    assert!(response.headers().get(SET_COOKIE).is_some());
    assert!(ctx.metrics.snapshot().models.is_empty());
}

#[tokio::test]
async fn test_startup_survives_broken_and_missing_artifacts() {
    let export = Export::new();
    export
        .model("SVM", "not json")
        .model("LogisticRegression", LOGISTIC)
        .preprocessor("scaler.json", "{");
    let ctx = export.context();

    assert_eq!(ctx.engine.model_names(), vec!["LogisticRegression"]);
    assert!(ctx.engine.scaler().is_none());

    let response = handlers::index(State(ctx), CookieJar::new()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_empty_export_still_serves() {
    let dir = TempDir::new().unwrap();
    let mut config = AppConfig::default();
    config.artifacts.export_root = dir.path().join("absent");
    let ctx = Arc::new(AppContext::build(config).unwrap());

    let report = ctx.engine.predict(&RawInput::from(full_form())).unwrap();
    assert!(report.is_empty());

    let html = body_text(handlers::index(State(ctx), CookieJar::new()).await.unwrap()).await;
    assert!(html.contains("No models are loaded."));
}

#[tokio::test]
async fn test_index_renders_performance_and_results() {
    let export = Export::new();
    export
        .model("KNN", KNN)
        .result("Final_Model_Performance.csv", "Model,Accuracy\nKNN,0.87\n")
        .result("confusion_KNN.png", "png");
    let ctx = export.context();

    let html = body_text(handlers::index(State(ctx.clone()), CookieJar::new()).await.unwrap()).await;
    assert!(html.contains("<td>0.87</td>"));
    assert!(html.contains("/results/confusion_KNN.png"));

    let response = handlers::serve_result(State(ctx.clone()), Path("Final_Model_Performance.csv".to_string()))
        .await
        .unwrap();
    assert_eq!(body_text(response).await, "Model,Accuracy\nKNN,0.87\n");

    let escaped = handlers::serve_result(State(ctx), Path("../models/KNN_best.json".to_string())).await;
    assert!(matches!(escaped, Err(WebError::NotFound(_))));
}

#[tokio::test]
async fn test_identical_submissions_give_identical_results() {
    let export = Export::new();
    export
        .model("KNN", KNN)
        .model("LogisticRegression", LOGISTIC)
        .preprocessor("feature_names.json", r#"["Balance", "TxnCount", "NewFeature"]"#);
    let ctx = export.context();

    let raw = RawInput::from(full_form());
    let first = ctx.engine.predict(&raw).unwrap();
    let second = ctx.engine.predict(&raw).unwrap();
    assert_eq!(first.results, second.results);
    assert_ne!(first.request_id, second.request_id);
}
