//! Classifier interface and the native estimator formats exported by training

use crate::error::PredictionError;
use crate::types::prediction::Label;
use serde::{Deserialize, Serialize};

/// A trained classifier that scores a single feature row.
///
/// Label prediction is mandatory. Class probabilities are an optional
/// capability: `predict_proba` returns `None` when the model cannot produce
/// them, which is not an error.
pub trait Predictor: Send + Sync {
    /// Predict the class label for one row
    fn predict(&self, features: &[f64]) -> Result<Label, PredictionError>;

    /// Class probabilities for one row, in class order
    fn predict_proba(&self, _features: &[f64]) -> Option<Result<Vec<f64>, PredictionError>> {
        None
    }

    /// Label and, when supported, probabilities for one row.
    ///
    /// Backends with a costly forward pass override this to run it once.
    fn predict_with_proba(&self, features: &[f64]) -> Result<(Label, Option<Vec<f64>>), PredictionError> {
        let label = self.predict(features)?;
        let probabilities = self.predict_proba(features).transpose()?;
        Ok((label, probabilities))
    }

    /// Short description of the model family, for logs and the health endpoint
    fn kind(&self) -> &'static str;
}

/// Estimator artifact as written by the export step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Estimator {
    LogisticRegression(LogisticRegression),
    LinearSvm(LinearSvm),
    KNearestNeighbors(KNearestNeighbors),
}

impl Estimator {
    /// Check that shapes inside the artifact agree with each other
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Estimator::LogisticRegression(m) => m.linear.validate(),
            Estimator::LinearSvm(m) => {
                m.linear.validate()?;
                if m.platt.is_some() && m.linear.classes.len() != 2 {
                    return Err("platt calibration requires exactly two classes".to_string());
                }
                Ok(())
            }
            Estimator::KNearestNeighbors(m) => m.validate(),
        }
    }

    /// Number of input features the estimator was trained on
    pub fn n_features(&self) -> usize {
        match self {
            Estimator::LogisticRegression(m) => m.linear.n_features(),
            Estimator::LinearSvm(m) => m.linear.n_features(),
            Estimator::KNearestNeighbors(m) => m.samples.first().map(Vec::len).unwrap_or(0),
        }
    }
}

impl Predictor for Estimator {
    fn predict(&self, features: &[f64]) -> Result<Label, PredictionError> {
        check_finite(features)?;
        match self {
            Estimator::LogisticRegression(m) => m.predict(features),
            Estimator::LinearSvm(m) => m.predict(features),
            Estimator::KNearestNeighbors(m) => m.predict(features),
        }
    }

    fn predict_proba(&self, features: &[f64]) -> Option<Result<Vec<f64>, PredictionError>> {
        let proba = match self {
            Estimator::LogisticRegression(m) => Some(m.predict_proba(features)),
            Estimator::LinearSvm(m) => m.predict_proba(features),
            Estimator::KNearestNeighbors(m) => Some(m.predict_proba(features)),
        }?;
        Some(check_finite(features).and(proba))
    }

    fn kind(&self) -> &'static str {
        match self {
            Estimator::LogisticRegression(_) => "logistic_regression",
            Estimator::LinearSvm(_) => "linear_svm",
            Estimator::KNearestNeighbors(_) => "k_nearest_neighbors",
        }
    }
}

/// Weights shared by linear classifiers.
///
/// Binary models carry a single coefficient row scoring `classes[1]`;
/// multiclass models carry one row per class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearWeights {
    pub classes: Vec<Label>,
    pub coef: Vec<Vec<f64>>,
    pub intercept: Vec<f64>,
}

impl LinearWeights {
    fn validate(&self) -> Result<(), String> {
        if self.classes.len() < 2 {
            return Err(format!("need at least 2 classes, got {}", self.classes.len()));
        }
        let expected_rows = if self.classes.len() == 2 { 1 } else { self.classes.len() };
        if self.coef.len() != expected_rows {
            return Err(format!(
                "{} classes need {} coefficient rows, got {}",
                self.classes.len(),
                expected_rows,
                self.coef.len()
            ));
        }
        if self.intercept.len() != self.coef.len() {
            return Err(format!(
                "intercept has {} entries for {} coefficient rows",
                self.intercept.len(),
                self.coef.len()
            ));
        }
        let width = self.n_features();
        if width == 0 || self.coef.iter().any(|row| row.len() != width) {
            return Err("coefficient rows must be non-empty and equally wide".to_string());
        }
        Ok(())
    }

    fn n_features(&self) -> usize {
        self.coef.first().map(Vec::len).unwrap_or(0)
    }

    fn is_binary(&self) -> bool {
        self.coef.len() == 1
    }

    /// Raw decision scores, one per coefficient row
    fn decision_function(&self, features: &[f64]) -> Result<Vec<f64>, PredictionError> {
        check_width(self.n_features(), features)?;
        Ok(self
            .coef
            .iter()
            .zip(&self.intercept)
            .map(|(row, b)| row.iter().zip(features).map(|(w, x)| w * x).sum::<f64>() + b)
            .collect())
    }

    /// Label from decision scores: sign for binary, argmax otherwise
    fn label_for(&self, scores: &[f64]) -> Label {
        let index = if self.is_binary() {
            usize::from(scores[0] > 0.0)
        } else {
            argmax(scores)
        };
        self.classes[index].clone()
    }
}

/// Logistic regression (binary sigmoid or multinomial softmax)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    #[serde(flatten)]
    pub linear: LinearWeights,
}

impl LogisticRegression {
    fn predict(&self, features: &[f64]) -> Result<Label, PredictionError> {
        let scores = self.linear.decision_function(features)?;
        Ok(self.linear.label_for(&scores))
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, PredictionError> {
        let scores = self.linear.decision_function(features)?;
        if self.linear.is_binary() {
            let p1 = sigmoid(scores[0]);
            Ok(vec![1.0 - p1, p1])
        } else {
            Ok(softmax(&scores))
        }
    }
}

/// Platt calibration parameters for a binary SVM: `p1 = 1 / (1 + exp(a*f + b))`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlattScaling {
    pub a: f64,
    pub b: f64,
}

/// Linear-kernel support vector classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearSvm {
    #[serde(flatten)]
    pub linear: LinearWeights,
    /// Present only when the model was trained with probability estimates
    #[serde(default)]
    pub platt: Option<PlattScaling>,
}

impl LinearSvm {
    fn predict(&self, features: &[f64]) -> Result<Label, PredictionError> {
        let scores = self.linear.decision_function(features)?;
        Ok(self.linear.label_for(&scores))
    }

    fn predict_proba(&self, features: &[f64]) -> Option<Result<Vec<f64>, PredictionError>> {
        let platt = self.platt?;
        Some(self.linear.decision_function(features).map(|scores| {
            let p1 = 1.0 / (1.0 + (platt.a * scores[0] + platt.b).exp());
            vec![1.0 - p1, p1]
        }))
    }
}

/// Neighbor vote weighting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NeighborWeights {
    #[default]
    Uniform,
    Distance,
}

/// k-nearest-neighbors classifier over stored training samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KNearestNeighbors {
    pub classes: Vec<Label>,
    pub k: usize,
    pub samples: Vec<Vec<f64>>,
    /// Index into `classes` for each sample
    pub targets: Vec<usize>,
    #[serde(default)]
    pub weights: NeighborWeights,
}

impl KNearestNeighbors {
    fn validate(&self) -> Result<(), String> {
        if self.classes.is_empty() {
            return Err("classes must not be empty".to_string());
        }
        if self.k == 0 || self.k > self.samples.len() {
            return Err(format!(
                "k must be between 1 and {} samples, got {}",
                self.samples.len(),
                self.k
            ));
        }
        if self.targets.len() != self.samples.len() {
            return Err(format!(
                "{} samples but {} targets",
                self.samples.len(),
                self.targets.len()
            ));
        }
        if let Some(bad) = self.targets.iter().find(|&&t| t >= self.classes.len()) {
            return Err(format!("target index {} out of range", bad));
        }
        let width = self.samples[0].len();
        if width == 0 || self.samples.iter().any(|s| s.len() != width) {
            return Err("samples must be non-empty and equally wide".to_string());
        }
        Ok(())
    }

    fn predict(&self, features: &[f64]) -> Result<Label, PredictionError> {
        let votes = self.votes(features)?;
        Ok(self.classes[argmax(&votes)].clone())
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, PredictionError> {
        let votes = self.votes(features)?;
        let total: f64 = votes.iter().sum();
        Ok(votes.iter().map(|v| v / total).collect())
    }

    /// Weighted vote per class from the k closest samples
    fn votes(&self, features: &[f64]) -> Result<Vec<f64>, PredictionError> {
        let width = self.samples.first().map(Vec::len).unwrap_or(0);
        check_width(width, features)?;

        let mut neighbors: Vec<(f64, usize)> = self
            .samples
            .iter()
            .zip(&self.targets)
            .map(|(sample, &target)| (euclidean(sample, features), target))
            .collect();
        neighbors.sort_by(|a, b| a.0.total_cmp(&b.0));
        neighbors.truncate(self.k);

        let votes = self.tally(&neighbors, self.weights);
        let total: f64 = votes.iter().sum();
        // Overflowing distances leave no usable weight
        if total.is_finite() && total > 0.0 {
            Ok(votes)
        } else {
            Ok(self.tally(&neighbors, NeighborWeights::Uniform))
        }
    }

    fn tally(&self, neighbors: &[(f64, usize)], weights: NeighborWeights) -> Vec<f64> {
        let mut votes = vec![0.0; self.classes.len()];
        // Exact matches take the whole vote under distance weighting
        let exact = neighbors.iter().any(|(d, _)| *d == 0.0);
        for &(distance, target) in neighbors {
            let weight = match weights {
                NeighborWeights::Uniform => 1.0,
                NeighborWeights::Distance if exact => f64::from(u8::from(distance == 0.0)),
                NeighborWeights::Distance => 1.0 / distance,
            };
            votes[target] += weight;
        }
        votes
    }
}

fn check_width(expected: usize, features: &[f64]) -> Result<(), PredictionError> {
    if expected != features.len() {
        return Err(PredictionError::WidthMismatch {
            expected,
            actual: features.len(),
        });
    }
    Ok(())
}

fn check_finite(features: &[f64]) -> Result<(), PredictionError> {
    if features.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(PredictionError::Runtime(
            "input contains NaN or infinity".to_string(),
        ))
    }
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.iter().map(|e| e / sum).collect()
}

/// Index of the largest value; the first one wins ties
fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(best, best_v), (i, &v)| {
            if v > best_v {
                (i, v)
            } else {
                (best, best_v)
            }
        })
        .0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary_logistic() -> Estimator {
        serde_json::from_str(
            r#"{
                "kind": "logistic_regression",
                "classes": [0, 1],
                "coef": [[1.0, -1.0]],
                "intercept": [0.0]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_logistic_binary_prediction() {
        let model = binary_logistic();
        model.validate().unwrap();

        assert_eq!(model.predict(&[3.0, 1.0]).unwrap(), Label::Int(1));
        assert_eq!(model.predict(&[1.0, 3.0]).unwrap(), Label::Int(0));

        let proba = model.predict_proba(&[0.0, 0.0]).unwrap().unwrap();
        assert!((proba[0] - 0.5).abs() < 1e-12);
        assert!((proba[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_logistic_multinomial_probabilities_sum_to_one() {
        let model = Estimator::LogisticRegression(LogisticRegression {
            linear: LinearWeights {
                classes: vec!["a".into(), "b".into(), "c".into()],
                coef: vec![vec![1.0], vec![2.0], vec![3.0]],
                intercept: vec![0.0, 0.0, 0.0],
            },
        });
        model.validate().unwrap();

        let proba = model.predict_proba(&[1.0]).unwrap().unwrap();
        assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert_eq!(model.predict(&[1.0]).unwrap(), Label::Text("c".to_string()));
    }

    #[test]
    fn test_width_mismatch_is_prediction_error() {
        let model = binary_logistic();
        let err = model.predict(&[1.0, 2.0, 3.0]).unwrap_err();
        assert_eq!(err, PredictionError::WidthMismatch { expected: 2, actual: 3 });
    }

    #[test]
    fn test_non_finite_input_is_rejected() {
        let model = binary_logistic();
        assert!(model.predict(&[f64::NAN, 1.0]).is_err());
        assert!(model.predict_proba(&[f64::INFINITY, 1.0]).unwrap().is_err());
    }

    #[test]
    fn test_svm_without_platt_has_no_probabilities() {
        let model: Estimator = serde_json::from_str(
            r#"{"kind": "linear_svm", "classes": [0, 1], "coef": [[2.0]], "intercept": [-1.0]}"#,
        )
        .unwrap();
        model.validate().unwrap();

        assert_eq!(model.predict(&[1.0]).unwrap(), Label::Int(1));
        assert_eq!(model.predict(&[0.0]).unwrap(), Label::Int(0));
        assert!(model.predict_proba(&[1.0]).is_none());
    }

    #[test]
    fn test_svm_with_platt_probabilities() {
        let model: Estimator = serde_json::from_str(
            r#"{
                "kind": "linear_svm",
                "classes": [0, 1],
                "coef": [[1.0]],
                "intercept": [0.0],
                "platt": {"a": -1.0, "b": 0.0}
            }"#,
        )
        .unwrap();

        let proba = model.predict_proba(&[0.0]).unwrap().unwrap();
        assert_eq!(proba, vec![0.5, 0.5]);
    }

    #[test]
    fn test_svm_multiclass_one_vs_rest() {
        let model = Estimator::LinearSvm(LinearSvm {
            linear: LinearWeights {
                classes: vec![Label::Int(0), Label::Int(1), Label::Int(2)],
                coef: vec![vec![-1.0], vec![0.0], vec![1.0]],
                intercept: vec![0.0, 0.5, 0.0],
            },
            platt: None,
        });
        model.validate().unwrap();
        assert_eq!(model.predict(&[2.0]).unwrap(), Label::Int(2));
        assert_eq!(model.predict(&[0.0]).unwrap(), Label::Int(1));
    }

    #[test]
    fn test_knn_uniform_vote() {
        let model = Estimator::KNearestNeighbors(KNearestNeighbors {
            classes: vec![Label::Int(0), Label::Int(1)],
            k: 3,
            samples: vec![vec![0.0], vec![0.1], vec![5.0], vec![5.1]],
            targets: vec![0, 0, 1, 1],
            weights: NeighborWeights::Uniform,
        });
        model.validate().unwrap();

        assert_eq!(model.predict(&[0.05]).unwrap(), Label::Int(0));
        let proba = model.predict_proba(&[0.05]).unwrap().unwrap();
        assert!((proba[0] - 2.0 / 3.0).abs() < 1e-12);
        assert!((proba[1] - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_knn_distance_weights_exact_match() {
        let model = Estimator::KNearestNeighbors(KNearestNeighbors {
            classes: vec![Label::Int(0), Label::Int(1)],
            k: 3,
            samples: vec![vec![1.0], vec![1.5], vec![2.0]],
            targets: vec![1, 0, 0],
            weights: NeighborWeights::Distance,
        });

        let proba = model.predict_proba(&[1.0]).unwrap().unwrap();
        assert_eq!(proba, vec![0.0, 1.0]);
        assert_eq!(model.predict(&[1.0]).unwrap(), Label::Int(1));
    }

    #[test]
    fn test_knn_distance_weights_overflow_falls_back_to_uniform() {
        let model = Estimator::KNearestNeighbors(KNearestNeighbors {
            classes: vec![Label::Int(0), Label::Int(1)],
            k: 1,
            samples: vec![vec![0.0], vec![1.0]],
            targets: vec![1, 0],
            weights: NeighborWeights::Distance,
        });

        let proba = model.predict_proba(&[1e300]).unwrap().unwrap();
        assert!(proba.iter().all(|p| p.is_finite()));
        assert_eq!(proba, vec![0.0, 1.0]);
        assert_eq!(model.predict(&[1e300]).unwrap(), Label::Int(1));
    }

    #[test]
    fn test_decision_boundary_label() {
        let model: Estimator = serde_json::from_str(
            r#"{"kind": "linear_svm", "classes": [0, 1], "coef": [[1.0]], "intercept": [0.0]}"#,
        )
        .unwrap();

        assert_eq!(model.predict(&[0.0]).unwrap(), Label::Int(0));
        assert_eq!(model.predict(&[1e-9]).unwrap(), Label::Int(1));
    }

    #[test]
    fn test_validate_rejects_bad_shapes() {
        let bad_linear: Estimator = serde_json::from_str(
            r#"{"kind": "logistic_regression", "classes": [0, 1], "coef": [[1.0], [2.0]], "intercept": [0.0, 0.0]}"#,
        )
        .unwrap();
        assert!(bad_linear.validate().is_err());

        let bad_knn = Estimator::KNearestNeighbors(KNearestNeighbors {
            classes: vec![Label::Int(0)],
            k: 5,
            samples: vec![vec![0.0]],
            targets: vec![0],
            weights: NeighborWeights::Uniform,
        });
        assert!(bad_knn.validate().is_err());
    }

    #[test]
    fn test_argmax_prefers_first_on_tie() {
        assert_eq!(argmax(&[0.5, 0.5]), 0);
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), 1);
    }
}
