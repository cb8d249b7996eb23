//! Canonical formatting of `.http` text.

use serde_json::Value;

use httpulse_domain::request::DEFAULT_CONTENT_TYPE;

use super::reader::text_to_request_with_content_type;
use super::writer::request_to_text;

/// Rewrites a text block in canonical layout.
///
/// The block is parsed and written back out, which normalises request-line
/// spacing, header spacing and blank lines between sections. A body that
/// looks like JSON and parses as strict JSON is pretty-printed with two-space
/// indentation. Text that does not parse is returned unchanged.
#[must_use]
pub fn format_http_text(text: &str) -> String {
    format_http_text_with_content_type(text, DEFAULT_CONTENT_TYPE)
}

/// Like [`format_http_text`], writing `default_content_type` for a block
/// without a `Content-Type` header.
#[must_use]
pub fn format_http_text_with_content_type(text: &str, default_content_type: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    let Some(parsed) = text_to_request_with_content_type(text, default_content_type) else {
        return text.to_string();
    };

    let mut request = parsed.request;
    if looks_like_json(&request.content_type, &request.body)
        && let Some(pretty) = pretty_json(&request.body)
    {
        request.body = pretty;
    }

    request_to_text(&request, parsed.name.as_deref())
}

fn looks_like_json(content_type: &str, body: &str) -> bool {
    content_type.to_ascii_lowercase().contains("json")
        || body.trim_start().starts_with(['{', '['])
}

fn pretty_json(body: &str) -> Option<String> {
    if body.trim().is_empty() {
        return None;
    }
    let value: Value = serde_json::from_str(body).ok()?;
    serde_json::to_string_pretty(&value).ok()
}
