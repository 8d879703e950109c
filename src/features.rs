//! Feature alignment for model inference.
//!
//! Turns submitted form fields into the numeric column order the scaler and
//! classifiers were trained on.

use crate::error::InputError;
use crate::types::input::{RawInput, REQUIRED_FIELDS};
use tracing::debug;

/// Aligns raw form input to the training-time feature order.
///
/// When an expected feature list is available it dictates the output order;
/// features the form does not carry are filled with `0.0` and form fields the
/// list does not name are dropped. Without a list, the declared order of the
/// required fields is used as-is.
#[derive(Debug, Clone)]
pub struct FeatureAligner {
    /// Fields every request must carry, in declared order
    required: Vec<String>,
    /// Feature order used when the scaler was fitted
    expected: Option<Vec<String>>,
}

impl FeatureAligner {
    /// Aligner over the standard six screening fields.
    pub fn new(expected: Option<Vec<String>>) -> Self {
        Self::with_required(REQUIRED_FIELDS.iter().map(|f| f.to_string()).collect(), expected)
    }

    /// Aligner over a custom required field set.
    pub fn with_required(required: Vec<String>, expected: Option<Vec<String>>) -> Self {
        Self { required, expected }
    }

    /// Produce the aligned feature vector for one request.
    ///
    /// All required fields must be present before any value is parsed.
    pub fn align(&self, raw: &RawInput) -> Result<Vec<f64>, InputError> {
        let missing = raw.missing(self.required.iter().map(String::as_str));
        if !missing.is_empty() {
            return Err(InputError::MissingFields(missing));
        }

        let mut parsed = Vec::with_capacity(self.required.len());
        for field in &self.required {
            let value = raw.get(field).unwrap_or_default();
            parsed.push((field.as_str(), parse_number(field, value)?));
        }

        let Some(expected) = &self.expected else {
            return Ok(parsed.into_iter().map(|(_, v)| v).collect());
        };

        let aligned = expected
            .iter()
            .map(|name| {
                parsed
                    .iter()
                    .find(|(field, _)| *field == name.as_str())
                    .map(|(_, v)| *v)
                    .unwrap_or_else(|| {
                        debug!(feature = %name, "Filling absent feature with 0");
                        0.0
                    })
            })
            .collect();

        Ok(aligned)
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        self.expected
            .as_ref()
            .map(Vec::len)
            .unwrap_or(self.required.len())
    }

    /// Get feature names in output order.
    pub fn feature_names(&self) -> Vec<&str> {
        match &self.expected {
            Some(expected) => expected.iter().map(String::as_str).collect(),
            None => self.required.iter().map(String::as_str).collect(),
        }
    }

    /// Whether the output order comes from a training-time feature list
    pub fn has_expected_order(&self) -> bool {
        self.expected.is_some()
    }

    pub fn required_fields(&self) -> &[String] {
        &self.required
    }
}

impl Default for FeatureAligner {
    fn default() -> Self {
        Self::new(None)
    }
}

fn parse_number(field: &str, value: &str) -> Result<f64, InputError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| InputError::InvalidNumber {
            field: field.to_string(),
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_input() -> RawInput {
        [
            ("TxnCount", "5"),
            ("Balance", "120.5"),
            ("AvgGasUsed", "21000"),
            ("TokenTransfers", "2"),
            ("TotalEthReceived", "1.2"),
            ("TotalEthSent", "0.8"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_declared_order_without_expected_list() {
        let aligner = FeatureAligner::new(None);
        let features = aligner.align(&sample_input()).unwrap();

        assert_eq!(features, vec![5.0, 120.5, 21000.0, 2.0, 1.2, 0.8]);
        assert_eq!(features.len(), aligner.feature_count());
    }

    #[test]
    fn test_expected_list_reorders_and_fills_zero() {
        let expected = vec![
            "Balance".to_string(),
            "TxnCount".to_string(),
            "NewFeature".to_string(),
        ];
        let aligner = FeatureAligner::new(Some(expected));

        let features = aligner.align(&sample_input()).unwrap();
        assert_eq!(features, vec![120.5, 5.0, 0.0]);
        assert_eq!(aligner.feature_names(), vec!["Balance", "TxnCount", "NewFeature"]);
    }

    #[test]
    fn test_length_follows_expected_list() {
        let expected: Vec<String> = (0..9).map(|i| format!("f{}", i)).collect();
        let aligner = FeatureAligner::new(Some(expected));

        let features = aligner.align(&sample_input()).unwrap();
        assert_eq!(features.len(), 9);
        assert!(features.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_missing_field_reported_before_parsing() {
        let input: RawInput = [
            ("TxnCount", "not a number"),
            ("AvgGasUsed", "21000"),
            ("TokenTransfers", "2"),
            ("TotalEthReceived", "1.2"),
            ("TotalEthSent", "0.8"),
        ]
        .into_iter()
        .collect();

        let err = FeatureAligner::default().align(&input).unwrap_err();
        assert_eq!(err, InputError::MissingFields(vec!["Balance".to_string()]));
    }

    #[test]
    fn test_non_numeric_value_is_rejected() {
        let mut input = sample_input();
        input.insert("AvgGasUsed", "lots");

        let err = FeatureAligner::default().align(&input).unwrap_err();
        assert_eq!(
            err,
            InputError::InvalidNumber {
                field: "AvgGasUsed".to_string(),
                value: "lots".to_string(),
            }
        );
    }

    #[test]
    fn test_surrounding_whitespace_is_accepted() {
        let mut input = sample_input();
        input.insert("Balance", "  42 ");

        let features = FeatureAligner::default().align(&input).unwrap();
        assert_eq!(features[1], 42.0);
    }

    #[test]
    fn test_extra_form_fields_are_ignored() {
        let mut input = sample_input();
        input.insert("csrf", "token");

        let features = FeatureAligner::default().align(&input).unwrap();
        assert_eq!(features.len(), 6);
    }
}
