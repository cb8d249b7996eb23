//! Structured HTTP request type

use serde::{Deserialize, Serialize};

use super::{Header, Headers, HttpMethod, QueryParam, QueryParams};
use crate::auth::AuthConfig;

/// Content type assumed when a request does not declare one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// The structured form of an HTTP request edited by the user.
///
/// `uri` excludes the query string; query parameters live in `query`.
/// Any text field may contain `{{placeholders}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct HttpRequest {
    /// HTTP method
    #[serde(default)]
    pub method: HttpMethod,
    /// Target URI without the query string
    #[serde(default)]
    pub uri: String,
    /// Content type of the body
    #[serde(default)]
    pub content_type: String,
    /// Raw body text
    #[serde(default)]
    pub body: String,
    /// Request headers, excluding `Content-Type` which lives in `content_type`
    #[serde(default)]
    pub headers: Headers,
    /// Query parameters
    #[serde(default)]
    pub query: QueryParams,
    /// Response-handler script text, without `>` prefixes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_handler: Option<String>,
    /// Authentication entries
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub auth: Vec<AuthConfig>,
}

impl HttpRequest {
    /// Creates a request with the given method and URI.
    #[must_use]
    pub fn new(method: HttpMethod, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            ..Self::default()
        }
    }

    /// Creates a GET request.
    #[must_use]
    pub fn get(uri: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, uri)
    }

    /// Appends an enabled header.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.add(Header::new(key, value));
        self
    }

    /// Appends an enabled query parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.add(QueryParam::new(key, value));
        self
    }

    /// Sets the body and its content type.
    #[must_use]
    pub fn with_body(mut self, content_type: impl Into<String>, body: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self.body = body.into();
        self
    }

    /// Sets the response-handler script.
    #[must_use]
    pub fn with_response_handler(mut self, script: impl Into<String>) -> Self {
        self.response_handler = Some(script.into());
        self
    }

    /// Appends an authentication entry.
    #[must_use]
    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth.push(auth);
        self
    }

    /// Returns true if the URI contains a placeholder.
    #[must_use]
    pub fn has_variables(&self) -> bool {
        self.uri.contains("{{") && self.uri.contains("}}")
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builder() {
        let req = HttpRequest::new(HttpMethod::Post, "{{baseUrl}}/users")
            .with_header("Authorization", "Bearer t")
            .with_query("page", "1")
            .with_body("application/json", r#"{"a":1}"#);

        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.headers.len(), 1);
        assert_eq!(req.query.len(), 1);
        assert_eq!(req.content_type, "application/json");
        assert!(req.has_variables());
    }

    #[test]
    fn test_default_request_is_get() {
        let req = HttpRequest::default();
        assert_eq!(req.method, HttpMethod::Get);
        assert!(req.uri.is_empty());
        assert!(!req.has_variables());
    }

    #[test]
    fn test_serialization_round_trip() {
        let req = HttpRequest::get("http://x.com")
            .with_response_handler("{% client.global.set(\"a\", 1) %}")
            .with_auth(AuthConfig::bearer("{{token}}"));

        let json = serde_json::to_string(&req).expect("serialize");
        assert!(json.contains("\"responseHandler\""));
        let back: HttpRequest = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, req);
    }
}
