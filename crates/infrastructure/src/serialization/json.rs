//! JSON serialization helpers for deterministic output.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::ser::{PrettyFormatter, Serializer};

/// Error type for serialization operations.
#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    /// JSON serialization failed.
    #[error("JSON serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// JSON deserialization failed.
    #[error("JSON deserialization failed: {0}")]
    Deserialize(serde_json::Error),

    /// UTF-8 encoding error.
    #[error("UTF-8 encoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Serializes a value to deterministic JSON.
///
/// Output format:
/// - 2-space indentation
/// - Trailing newline
/// - Struct fields in declaration order
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_json_stable<T: Serialize>(value: &T) -> Result<String, SerializationError> {
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"  ");
    let mut serializer = Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;

    let mut json = String::from_utf8(buffer)?;
    json.push('\n');
    Ok(json)
}

/// Same as [`to_json_stable`], returning bytes for direct file writing.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_json_stable_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, SerializationError> {
    to_json_stable(value).map(String::into_bytes)
}

/// Deserializes JSON from a string.
///
/// # Errors
///
/// Returns an error if the JSON is invalid or doesn't match the expected type.
pub fn from_json<T: DeserializeOwned>(json: &str) -> Result<T, SerializationError> {
    serde_json::from_str(json).map_err(SerializationError::Deserialize)
}

/// Deserializes JSON from bytes.
///
/// # Errors
///
/// Returns an error if the JSON is invalid or doesn't match the expected type.
pub fn from_json_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, SerializationError> {
    serde_json::from_slice(bytes).map_err(SerializationError::Deserialize)
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use httpulse_domain::environment::Environment;
    use httpulse_domain::request::HttpRequest;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_environment_file_layout() {
        let env = Environment::new("dev").with_variable("baseUrl", "http://localhost:3000");

        let json = to_json_stable(&env).expect("serialize");

        assert!(json.ends_with("}\n"));
        assert!(json.starts_with("{\n  \"id\": "));
        let name = json.find("\"name\"").expect("name");
        let variables = json.find("\"variables\"").expect("variables");
        let updated = json.find("\"updatedAt\"").expect("updatedAt");
        assert!(name < variables && variables < updated);
        assert!(json.contains("\n      \"key\": \"baseUrl\""));
    }

    #[test]
    fn test_output_is_deterministic() {
        let env = Environment::new("dev").with_variable("a", "1");
        assert_eq!(
            to_json_stable(&env).expect("first"),
            to_json_stable(&env).expect("second")
        );
    }

    #[test]
    fn test_environment_roundtrip() {
        let env = Environment::new("prod")
            .with_description("Production")
            .with_variable("token", "");

        let bytes = to_json_stable_bytes(&env).expect("serialize");
        let restored: Environment = from_json_bytes(&bytes).expect("deserialize");

        assert_eq!(restored, env);
    }

    #[test]
    fn test_request_from_minified_json() {
        let request: HttpRequest =
            from_json(r#"{"method":"POST","uri":"/a"}"#).expect("deserialize");

        assert_eq!(request.uri, "/a");
        assert!(request.headers.is_empty());
        assert!(from_json::<HttpRequest>(r#"{"method":"post"}"#).is_err());
    }

    #[test]
    fn test_invalid_json_is_a_deserialize_error() {
        let result: Result<Environment, _> = from_json(r#"{"id": }"#);
        assert!(matches!(result, Err(SerializationError::Deserialize(_))));
    }
}
