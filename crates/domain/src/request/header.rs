//! HTTP header types

use serde::{Deserialize, Serialize};

/// A single request header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// The header name (e.g., "Authorization")
    pub key: String,
    /// The header value
    #[serde(default)]
    pub value: String,
    /// Whether this header is sent
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

const fn default_enabled() -> bool {
    true
}

impl Header {
    /// Creates a new enabled header.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            enabled: true,
        }
    }

    /// Creates a new disabled header.
    #[must_use]
    pub fn disabled(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            enabled: false,
        }
    }

    /// Returns true if this header's name matches `name`, ignoring ASCII case.
    #[must_use]
    pub fn is_named(&self, name: &str) -> bool {
        self.key.eq_ignore_ascii_case(name)
    }
}

/// An ordered list of headers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Headers {
    items: Vec<Header>,
}

impl Headers {
    /// Creates an empty header list.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Appends a header.
    pub fn add(&mut self, header: Header) {
        self.items.push(header);
    }

    /// Returns an iterator over enabled headers.
    pub fn enabled(&self) -> impl Iterator<Item = &Header> {
        self.items.iter().filter(|h| h.enabled)
    }

    /// Returns true if an enabled header with the given name exists (ASCII case-insensitive).
    #[must_use]
    pub fn contains_enabled(&self, name: &str) -> bool {
        self.enabled().any(|h| h.is_named(name))
    }

    /// Returns all headers (enabled and disabled).
    #[must_use]
    pub fn all(&self) -> &[Header] {
        &self.items
    }

    /// Returns mutable access to all headers.
    pub fn all_mut(&mut self) -> &mut [Header] {
        &mut self.items
    }

    /// Returns the number of headers.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Vec::len is not const in stable
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if there are no headers.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Vec::is_empty is not const in stable
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FromIterator<Header> for Headers {
    fn from_iter<T: IntoIterator<Item = Header>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_filter_enabled() {
        let headers: Headers = [
            Header::new("Accept", "application/json"),
            Header::disabled("X-Debug", "true"),
            Header::new("User-Agent", "HTTPulse"),
        ]
        .into_iter()
        .collect();

        assert_eq!(headers.enabled().count(), 2);
        assert_eq!(headers.len(), 3);
    }

    #[test]
    fn test_contains_enabled_ignores_case_and_disabled() {
        let headers: Headers = [
            Header::new("content-type", "text/plain"),
            Header::disabled("Authorization", "Bearer x"),
        ]
        .into_iter()
        .collect();

        assert!(headers.contains_enabled("Content-Type"));
        assert!(!headers.contains_enabled("authorization"));
    }
}
