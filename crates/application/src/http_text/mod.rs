//! Conversion between structured requests and `.http` text
//!
//! The text form is line oriented:
//!
//! ```http
//! ### Create user
//! POST {{baseUrl}}/users?notify=true
//! Authorization: Bearer {{token}}
//! Content-Type: application/json
//!
//! {"name": "John"}
//!
//! > {% client.global.set("userId", response.body.id) %}
//! ```
//!
//! Both directions are pure functions. Malformed text never produces an
//! error; [`text_to_request`] returns `None` instead so an editor can keep
//! working on half-typed input.

mod encoding;
mod format;
mod reader;
mod writer;

pub use encoding::{decode_query_component, encode_query_component};
pub use format::{format_http_text, format_http_text_with_content_type};
pub use reader::{ParsedHttpText, text_to_request, text_to_request_with_content_type};
pub use writer::request_to_text;

#[cfg(test)]
#[allow(clippy::panic)]
mod round_trip_tests {
    use super::*;
    use httpulse_domain::auth::AuthConfig;
    use httpulse_domain::request::{Header, HttpMethod, HttpRequest, QueryParam};
    use pretty_assertions::assert_eq;

    fn round_trip(request: &HttpRequest, name: Option<&str>) -> ParsedHttpText {
        let text = request_to_text(request, name);
        text_to_request(&text).unwrap_or_else(|| panic!("failed to parse:\n{text}"))
    }

    #[test]
    fn test_round_trip_full_request() {
        let request = HttpRequest::new(HttpMethod::Post, "{{baseUrl}}/users")
            .with_query("page", "1")
            .with_query("filter", "name=a&b")
            .with_header("Authorization", "Bearer {{token}}")
            .with_header("X-Trace", "abc: def")
            .with_body("application/json", "{\n  \"name\": \"John\"\n}")
            .with_response_handler("{% client.global.set(\"id\", response.body.id) %}");

        let parsed = round_trip(&request, Some("Create user"));

        assert_eq!(parsed.name.as_deref(), Some("Create user"));
        assert_eq!(parsed.request, request);
    }

    #[test]
    fn test_round_trip_every_method() {
        for method in HttpMethod::all() {
            let request = HttpRequest::new(*method, "http://x.com/a")
                .with_body("text/plain", "");
            let parsed = round_trip(&request, None);
            assert_eq!(parsed.request.method, *method);
            assert_eq!(parsed.name, None);
        }
    }

    #[test]
    fn test_round_trip_trims_trailing_body_whitespace() {
        let request = HttpRequest::get("http://x.com")
            .with_body("text/plain", "line one\n  indented\n\n\n  ");

        let parsed = round_trip(&request, None);

        assert_eq!(parsed.request.body, "line one\n  indented");
    }

    #[test]
    fn test_round_trip_moves_content_type_header_into_field() {
        let mut request = HttpRequest::get("http://x.com").with_body("", "<a/>");
        request.headers.add(Header::new("content-type", "application/xml"));

        let parsed = round_trip(&request, None);

        assert!(parsed.request.headers.is_empty());
        assert_eq!(parsed.request.content_type, "application/xml");
        assert_eq!(parsed.request.body, "<a/>");
    }

    #[test]
    fn test_round_trip_drops_disabled_entries() {
        let mut request = HttpRequest::get("http://x.com").with_body("text/plain", "");
        request.headers.add(Header::disabled("X-Off", "1"));
        request.query.add(QueryParam::disabled("off", "1"));
        request.query.add(QueryParam::new("on", "2"));

        let parsed = round_trip(&request, None);

        assert!(parsed.request.headers.is_empty());
        assert_eq!(parsed.request.query.all(), &[QueryParam::new("on", "2")]);
    }

    #[test]
    fn test_round_trip_keeps_placeholders_in_query() {
        let request = HttpRequest::get("{{baseUrl}}/search")
            .with_query("q", "{{term}}")
            .with_query("{{key}}", "a b")
            .with_body("application/json", "");

        let parsed = round_trip(&request, None);

        assert_eq!(parsed.request.query, request.query);
        let text = request_to_text(&request, None);
        assert!(text.starts_with("GET {{baseUrl}}/search?q={{term}}&{{key}}=a%20b\n"));
    }

    #[test]
    fn test_round_trip_keeps_spaced_placeholder_in_query() {
        let request = HttpRequest::get("http://x.com/a")
            .with_query("auth", "{{ token }}")
            .with_body("application/json", "");

        let parsed = round_trip(&request, None);

        assert_eq!(parsed.request.uri, "http://x.com/a");
        assert_eq!(parsed.request.query.all(), &[QueryParam::new("auth", "{{ token }}")]);
    }

    #[test]
    fn test_round_trip_keeps_spaced_placeholder_in_uri() {
        let request = HttpRequest::get("{{ baseUrl }}/users").with_body("application/json", "");

        let parsed = round_trip(&request, None);

        assert_eq!(parsed.request, request);
    }

    #[test]
    fn test_empty_uri_does_not_round_trip() {
        // "GET " has a single token, so the text form cannot carry an empty uri.
        let request = HttpRequest::get("");
        let text = request_to_text(&request, None);

        assert_eq!(text, "GET ");
        assert_eq!(text_to_request(&text), None);
    }

    #[test]
    fn test_round_trip_ignores_auth() {
        let request = HttpRequest::get("http://x.com")
            .with_body("application/json", "")
            .with_auth(AuthConfig::bearer("t"));

        let parsed = round_trip(&request, None);

        assert!(parsed.request.auth.is_empty());
    }

    #[test]
    fn test_conversion_is_stable_after_one_pass() {
        let text = "#comment\n### Ping\nget   http://x.com/a?x=1   \n  Accept :  */*  \n\n\n{\"a\":1}\n\n\n> line one\n>   line two\n";

        let first = text_to_request(text).map(|p| request_to_text(&p.request, p.name.as_deref()));
        let second = first
            .as_deref()
            .and_then(text_to_request)
            .map(|p| request_to_text(&p.request, p.name.as_deref()));

        assert_eq!(first, second);
    }
}
