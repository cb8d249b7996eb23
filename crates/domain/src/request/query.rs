//! Query parameter types

use serde::{Deserialize, Serialize};

/// A query parameter key-value pair.
///
/// Supports enable/disable without deletion for UI convenience.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParam {
    /// The parameter key
    pub key: String,
    /// The parameter value
    #[serde(default)]
    pub value: String,
    /// Whether this parameter is appended to the URL
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

const fn default_enabled() -> bool {
    true
}

impl QueryParam {
    /// Creates a new enabled query parameter.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            enabled: true,
        }
    }

    /// Creates a disabled query parameter.
    #[must_use]
    pub fn disabled(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            enabled: false,
        }
    }
}

/// An ordered list of query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryParams {
    items: Vec<QueryParam>,
}

impl QueryParams {
    /// Creates an empty query parameter list.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Appends a query parameter.
    pub fn add(&mut self, param: QueryParam) {
        self.items.push(param);
    }

    /// Returns an iterator over enabled parameters with a non-empty key.
    pub fn enabled(&self) -> impl Iterator<Item = &QueryParam> {
        self.items.iter().filter(|p| p.enabled && !p.key.is_empty())
    }

    /// Returns all parameters (enabled and disabled).
    #[must_use]
    pub fn all(&self) -> &[QueryParam] {
        &self.items
    }

    /// Returns the number of parameters.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if there are no parameters.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FromIterator<QueryParam> for QueryParams {
    fn from_iter<T: IntoIterator<Item = QueryParam>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}
