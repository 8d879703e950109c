//! Export directory layout written by the training pipeline.
//!
//! ```text
//! {export_root}/models/{ModelName}_best.json
//! {export_root}/preprocessors/scaler.json
//! {export_root}/preprocessors/feature_names.json
//! {export_root}/results/*
//! ```

use crate::error::ArtifactError;
use crate::models::scaler::StandardScaler;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

/// Performance summary rendered on the index page when present
pub const PERFORMANCE_FILE: &str = "Final_Model_Performance.csv";

const SCALER_FILE: &str = "scaler.json";
const FEATURE_NAMES_FILE: &str = "feature_names.json";

/// Read-only view over an export directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn models_dir(&self) -> PathBuf {
        self.root.join("models")
    }

    pub fn preprocessors_dir(&self) -> PathBuf {
        self.root.join("preprocessors")
    }

    pub fn results_dir(&self) -> PathBuf {
        self.root.join("results")
    }

    /// Load the exported scaler; `Ok(None)` when no scaler was exported
    pub fn load_scaler(&self) -> Result<Option<StandardScaler>, ArtifactError> {
        let path = self.preprocessors_dir().join(SCALER_FILE);
        let Some(scaler) = read_json::<StandardScaler>(&path)? else {
            info!(path = %path.display(), "Scaler file not found");
            return Ok(None);
        };
        scaler
            .validate()
            .map_err(|reason| ArtifactError::invalid(&path, reason))?;
        info!(path = %path.display(), fitted = scaler.is_fitted(), "Loaded scaler");
        Ok(Some(scaler))
    }

    /// Load the training-time feature order; `Ok(None)` when absent
    pub fn load_feature_names(&self) -> Result<Option<Vec<String>>, ArtifactError> {
        let path = self.preprocessors_dir().join(FEATURE_NAMES_FILE);
        let names = read_json::<Vec<String>>(&path)?;
        match &names {
            Some(names) => info!(path = %path.display(), features = ?names, "Loaded expected features"),
            None => info!(path = %path.display(), "Feature names file not found"),
        }
        Ok(names)
    }

    /// Names of everything in the results directory, sorted
    pub fn list_results(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(self.results_dir()) else {
            return Vec::new();
        };
        let mut files: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        files.sort();
        files
    }

    /// Parsed performance summary, if present and well-formed
    pub fn performance_table(&self) -> Option<PerformanceTable> {
        let path = self.results_dir().join(PERFORMANCE_FILE);
        let text = std::fs::read_to_string(&path).ok()?;
        match PerformanceTable::parse(&text) {
            Ok(table) => Some(table),
            Err(reason) => {
                debug!(path = %path.display(), reason = %reason, "Skipping unparseable performance table");
                None
            }
        }
    }

    /// Resolve a requested result file, refusing paths that leave the
    /// results directory. Returns `None` unless the target is a regular file.
    pub fn resolve_result(&self, requested: &str) -> Option<PathBuf> {
        let relative = Path::new(requested);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if requested.is_empty() || !safe {
            return None;
        }
        let path = self.results_dir().join(relative);
        path.is_file().then_some(path)
    }
}

/// Read a JSON artifact, treating a missing file as `None`
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, ArtifactError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ArtifactError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| ArtifactError::Json {
            path: path.to_path_buf(),
            source,
        })
}

/// Header plus rows of a small CSV file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl PerformanceTable {
    /// Parse CSV text with a header line.
    ///
    /// Quoted fields may contain commas, newlines and doubled quotes. Short
    /// rows are padded; rows wider than the header are rejected.
    pub fn parse(text: &str) -> Result<Self, String> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| e.to_string())?
            .iter()
            .map(str::to_string)
            .collect();
        if headers.is_empty() {
            return Err("no columns to parse".to_string());
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| e.to_string())?;
            if record.len() > headers.len() {
                let line = record.position().map(|p| p.line()).unwrap_or_default();
                return Err(format!(
                    "line {}: expected {} fields, saw {}",
                    line,
                    headers.len(),
                    record.len()
                ));
            }
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            row.resize(headers.len(), String::new());
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, ArtifactStore) {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        std::fs::create_dir_all(store.preprocessors_dir()).unwrap();
        std::fs::create_dir_all(store.results_dir()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_missing_preprocessors_are_none() {
        let (_dir, store) = store();
        assert_eq!(store.load_scaler().unwrap(), None);
        assert_eq!(store.load_feature_names().unwrap(), None);
    }

    #[test]
    fn test_loads_feature_names() {
        let (_dir, store) = store();
        std::fs::write(
            store.preprocessors_dir().join("feature_names.json"),
            r#"["Balance", "TxnCount"]"#,
        )
        .unwrap();

        assert_eq!(
            store.load_feature_names().unwrap(),
            Some(vec!["Balance".to_string(), "TxnCount".to_string()])
        );
    }

    #[test]
    fn test_corrupt_scaler_is_error() {
        let (_dir, store) = store();
        std::fs::write(store.preprocessors_dir().join("scaler.json"), "{").unwrap();
        assert!(matches!(store.load_scaler(), Err(ArtifactError::Json { .. })));
    }

    #[test]
    fn test_loads_fitted_scaler() {
        let (_dir, store) = store();
        std::fs::write(
            store.preprocessors_dir().join("scaler.json"),
            r#"{"mean": [1.0, 2.0], "scale": [1.0, 4.0]}"#,
        )
        .unwrap();

        let scaler = store.load_scaler().unwrap().unwrap();
        assert!(scaler.is_fitted());
        assert_eq!(scaler.n_features(), Some(2));
    }

    #[test]
    fn test_list_results_sorted() {
        let (_dir, store) = store();
        for name in ["roc.png", "confusion.png", "Final_Model_Performance.csv"] {
            std::fs::write(store.results_dir().join(name), "x").unwrap();
        }

        assert_eq!(
            store.list_results(),
            vec!["Final_Model_Performance.csv", "confusion.png", "roc.png"]
        );
    }

    #[test]
    fn test_list_results_without_directory() {
        let dir = TempDir::new().unwrap();
        assert!(ArtifactStore::new(dir.path()).list_results().is_empty());
    }

    #[test]
    fn test_resolve_result_rejects_traversal() {
        let (dir, store) = store();
        std::fs::write(store.results_dir().join("roc.png"), "x").unwrap();
        std::fs::write(dir.path().join("secret.txt"), "x").unwrap();

        assert!(store.resolve_result("roc.png").is_some());
        assert!(store.resolve_result("../secret.txt").is_none());
        assert!(store.resolve_result("/etc/passwd").is_none());
        assert!(store.resolve_result("missing.png").is_none());
        assert!(store.resolve_result("").is_none());
    }

    #[test]
    fn test_performance_table_parses() {
        let (_dir, store) = store();
        std::fs::write(
            store.results_dir().join(PERFORMANCE_FILE),
            "Model,Accuracy,F1\nSVM,0.91,0.88\n\"KNN, k=5\",0.87,\n",
        )
        .unwrap();

        let table = store.performance_table().unwrap();
        assert_eq!(table.headers, vec!["Model", "Accuracy", "F1"]);
        assert_eq!(table.rows[1], vec!["KNN, k=5", "0.87", ""]);
    }

    #[test]
    fn test_malformed_performance_table_is_skipped() {
        let (_dir, store) = store();
        std::fs::write(store.results_dir().join(PERFORMANCE_FILE), "a,b\n1,2,3\n").unwrap();
        assert!(store.performance_table().is_none());

        std::fs::write(store.results_dir().join(PERFORMANCE_FILE), "").unwrap();
        assert!(store.performance_table().is_none());
    }

    #[test]
    fn test_performance_table_quoted_fields() {
        let table = PerformanceTable::parse(
            "Model,Notes\nSVM,\"say \"\"hi\"\"\"\nKNN,\"first line\nsecond line\"\n",
        )
        .unwrap();

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0], vec!["SVM", r#"say "hi""#]);
        assert_eq!(table.rows[1], vec!["KNN", "first line\nsecond line"]);
    }
}
