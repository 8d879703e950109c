//! Raw form input submitted for screening

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Form fields every prediction request must carry, in declared order.
///
/// Without a feature-name artifact this is also the column order handed to
/// the scaler and the models.
pub const REQUIRED_FIELDS: [&str; 6] = [
    "TxnCount",
    "Balance",
    "AvgGasUsed",
    "TokenTransfers",
    "TotalEthReceived",
    "TotalEthSent",
];

/// Field name to string value mapping for one request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawInput {
    fields: HashMap<String, String>,
}

impl RawInput {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Value submitted for `field`, if any
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Whether `field` was submitted (an empty value still counts)
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Names from `required` that were not submitted, in the order given
    pub fn missing<'a, I>(&self, required: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        required
            .into_iter()
            .filter(|name| !self.contains(name))
            .map(str::to_string)
            .collect()
    }

    /// Set a field, replacing any previous value
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<HashMap<String, String>> for RawInput {
    fn from(fields: HashMap<String, String>) -> Self {
        Self { fields }
    }
}

impl<K, V> FromIterator<(K, V)> for RawInput
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
