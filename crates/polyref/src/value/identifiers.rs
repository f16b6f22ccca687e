//! Ordered identifier mappings and their storage encoding

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::Scalar;

/// Identifier values of a record, keyed by identifier field name.
///
/// Field order is significant: the storage encoding lists fields in
/// insertion order, so two mappings with the same fields in a different
/// order encode differently.
///
/// # Example
///
/// ```
/// use polyref::Identifiers;
///
/// let ids = Identifiers::new().with("tenant", "acme").with("id", 7);
/// assert_eq!(ids.encode().unwrap(), r#"{"tenant":"acme","id":7}"#);
/// assert_eq!(Identifiers::decode(r#"{"tenant":"acme","id":7}"#).unwrap(), ids);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifiers(IndexMap<String, Scalar>);

impl Identifiers {
    /// Create an empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Mapping with a single field, e.g. `Identifiers::single("id", 1)`
    pub fn single(field: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Self::new().with(field, value)
    }

    /// Add a field (builder pattern)
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.insert(field, value);
        self
    }

    /// Insert or replace a field, keeping its original position on replace
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Scalar>) {
        self.0.insert(field.into(), value.into());
    }

    /// Get a field's value
    pub fn get(&self, field: &str) -> Option<&Scalar> {
        self.0.get(field)
    }

    /// Number of identifier fields
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// No identifier fields (the record has not been persisted)
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate fields in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Field names in order
    pub fn fields(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }

    /// Encode as a compact JSON object, fields in mapping order.
    ///
    /// This is the form written to storage and compared in filters.
    /// Non-finite floats are rejected, since JSON cannot represent them.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        let non_finite = self
            .0
            .iter()
            .find(|(_, value)| matches!(value, Scalar::Float(n) if !n.is_finite()));
        if let Some((field, value)) = non_finite {
            return Err(<serde_json::Error as serde::ser::Error>::custom(format!(
                "identifier field '{}' is not a finite number: {}",
                field, value
            )));
        }
        serde_json::to_string(&self.0)
    }

    /// Decode the storage form produced by [`Identifiers::encode`]
    pub fn decode(encoded: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(encoded)
    }
}

impl<K: Into<String>, V: Into<Scalar>> FromIterator<(K, V)> for Identifiers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Identifiers(
            iter.into_iter()
                .map(|(k, v)| -> (String, Scalar) { (k.into(), v.into()) })
                .collect(),
        )
    }
}

impl IntoIterator for Identifiers {
    type Item = (String, Scalar);
    type IntoIter = indexmap::map::IntoIter<String, Scalar>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
