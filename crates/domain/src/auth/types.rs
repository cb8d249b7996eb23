//! Authentication configuration types

use serde::{Deserialize, Serialize};

/// One authentication entry attached to a request.
///
/// Credential fields may contain `{{placeholders}}`; they are resolved along
/// with the rest of the request before dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    /// API key sent in a header or query parameter
    ApiKey {
        /// The API key value
        key: String,
        /// Header or query parameter name
        name: String,
        /// Where to add the key
        #[serde(default)]
        location: ApiKeyLocation,
    },
    /// Bearer token authentication
    Bearer {
        /// The bearer token (may contain variables like `{{token}}`)
        token: String,
    },
    /// Basic authentication
    Basic {
        /// Username (may contain variables)
        username: String,
        /// Password (may contain variables)
        password: String,
    },
}

/// Location for API key authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApiKeyLocation {
    /// Add to request headers
    #[default]
    Header,
    /// Add to query parameters
    Query,
}

impl AuthConfig {
    /// Creates a bearer token entry.
    #[must_use]
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer {
            token: token.into(),
        }
    }

    /// Creates a basic authentication entry.
    #[must_use]
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Creates an API key entry sent as a header.
    #[must_use]
    pub fn api_key_header(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self::ApiKey {
            key: key.into(),
            name: name.into(),
            location: ApiKeyLocation::Header,
        }
    }
}
