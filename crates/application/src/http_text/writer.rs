//! Structured request to text.

use httpulse_domain::request::HttpRequest;

use super::encoding::encode_query_component;

/// Serializes a request into its `.http` text form.
///
/// Only enabled headers and query parameters are written. A `Content-Type`
/// line is synthesized from `content_type` unless an enabled header already
/// declares one. The body is written without trailing whitespace and each
/// non-blank response-handler line gets a `> ` prefix.
#[must_use]
pub fn request_to_text(request: &HttpRequest, name: Option<&str>) -> String {
    let mut lines: Vec<String> = Vec::new();

    if let Some(name) = name.filter(|n| !n.is_empty()) {
        lines.push(format!("### {name}"));
    }

    lines.push(format!("{} {}", request.method, request_url(request)));

    for header in request.headers.enabled().filter(|h| !h.key.is_empty()) {
        lines.push(format!("{}: {}", header.key, header.value));
    }

    if !request.content_type.is_empty() && !request.headers.contains_enabled("Content-Type") {
        lines.push(format!("Content-Type: {}", request.content_type));
    }

    let body = request.body.trim_end();
    if !body.is_empty() {
        lines.push(String::new());
        lines.push(body.to_string());
    }

    if let Some(script) = request.response_handler.as_deref().filter(|s| !s.is_empty()) {
        lines.push(String::new());
        lines.extend(
            script
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(|line| format!("> {line}")),
        );
    }

    lines.join("\n")
}

fn request_url(request: &HttpRequest) -> String {
    let query = request
        .query
        .enabled()
        .map(|param| {
            format!(
                "{}={}",
                encode_query_component(&param.key),
                encode_query_component(&param.value)
            )
        })
        .collect::<Vec<_>>()
        .join("&");

    if query.is_empty() {
        return request.uri.clone();
    }

    let separator = if request.uri.contains('?') { '&' } else { '?' };
    format!("{}{separator}{query}", request.uri)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpulse_domain::request::{Header, HttpMethod};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_minimal_request() {
        let request = HttpRequest::get("http://x.com");
        assert_eq!(request_to_text(&request, None), "GET http://x.com");
    }

    #[test]
    fn test_full_request() {
        let request = HttpRequest::new(HttpMethod::Post, "{{baseUrl}}/users")
            .with_query("page", "1")
            .with_header("Authorization", "Bearer t")
            .with_body("application/json", "{\"a\":1}\n\n")
            .with_response_handler("line one\n\n   line two  ");

        let text = request_to_text(&request, Some("Create"));

        assert_eq!(
            text,
            "### Create\n\
             POST {{baseUrl}}/users?page=1\n\
             Authorization: Bearer t\n\
             Content-Type: application/json\n\
             \n\
             {\"a\":1}\n\
             \n\
             > line one\n\
             > line two"
        );
    }

    #[test]
    fn test_appends_to_existing_query_string() {
        let request = HttpRequest::get("http://x.com/a?fixed=1").with_query("b", "2");
        assert_eq!(request_to_text(&request, None), "GET http://x.com/a?fixed=1&b=2");
    }

    #[test]
    fn test_content_type_header_wins_over_field() {
        let mut request = HttpRequest::get("http://x.com").with_body("application/json", "");
        request.headers.add(Header::new("CONTENT-TYPE", "text/plain"));

        let text = request_to_text(&request, None);

        assert_eq!(text, "GET http://x.com\nCONTENT-TYPE: text/plain");
    }

    #[test]
    fn test_disabled_content_type_header_does_not_suppress_field() {
        let mut request = HttpRequest::get("http://x.com").with_body("text/plain", "");
        request.headers.add(Header::disabled("Content-Type", "text/html"));

        let text = request_to_text(&request, None);

        assert_eq!(text, "GET http://x.com\nContent-Type: text/plain");
    }

    #[test]
    fn test_whitespace_only_body_is_omitted() {
        let request = HttpRequest::get("http://x.com").with_body("", " \n\t\n");
        assert_eq!(request_to_text(&request, None), "GET http://x.com");
    }

    #[test]
    fn test_empty_name_is_omitted() {
        let request = HttpRequest::get("http://x.com");
        assert_eq!(request_to_text(&request, Some("")), "GET http://x.com");
    }

    #[test]
    fn test_query_values_are_encoded() {
        let request = HttpRequest::get("http://x.com").with_query("q", "a b&c");
        assert_eq!(request_to_text(&request, None), "GET http://x.com?q=a%20b%26c");
    }
}
