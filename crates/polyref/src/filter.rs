//! Column/value pairs for building reference query predicates

use indexmap::IndexMap;
use serde::Serialize;

/// Equality predicates over reference columns.
///
/// Each entry means "column equals value"; a `None` value means the column
/// must be NULL. Hosts translate this into their query builder of choice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FilterCriteria(IndexMap<String, Option<String>>);

impl FilterCriteria {
    /// Create an empty criteria set
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `column` to equal `value` (or be NULL for `None`)
    pub fn insert(&mut self, column: impl Into<String>, value: Option<String>) {
        self.0.insert(column.into(), value);
    }

    /// Expected value for a column.
    ///
    /// The outer `Option` is `None` if the column is not constrained at all.
    pub fn get(&self, column: &str) -> Option<Option<&str>> {
        self.0.get(column).map(Option::as_deref)
    }

    /// Whether the column takes part in the filter
    pub fn constrains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    /// Number of constrained columns
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// No constraints
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate constraints in column order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    /// Consume into the underlying ordered map
    pub fn into_inner(self) -> IndexMap<String, Option<String>> {
        self.0
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, Option<V>)> for FilterCriteria {
    fn from_iter<I: IntoIterator<Item = (K, Option<V>)>>(iter: I) -> Self {
        FilterCriteria(
            iter.into_iter()
                .map(|(k, v)| -> (String, Option<String>) { (k.into(), v.map(Into::into)) })
                .collect(),
        )
    }
}
