//! Text to structured request.

use tracing::debug;

use httpulse_domain::request::{
    DEFAULT_CONTENT_TYPE, Header, Headers, HttpMethod, HttpRequest, QueryParam, QueryParams,
};

use super::encoding::decode_query_component;

/// A request parsed from text, with its optional `### name` title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedHttpText {
    /// The display name from the last `###` line before the request line
    pub name: Option<String>,
    /// The parsed request. `response_handler` holds the `>` lines, unprefixed.
    pub request: HttpRequest,
}

/// Parses the `.http` text form of a single request.
///
/// Returns `None` when there is no request line, the request line has fewer
/// than two tokens, or the method is unknown. Everything after the method,
/// minus an optional `HTTP/x.y` suffix, is the URL.
#[must_use]
pub fn text_to_request(text: &str) -> Option<ParsedHttpText> {
    text_to_request_with_content_type(text, DEFAULT_CONTENT_TYPE)
}

/// Like [`text_to_request`], using `default_content_type` when the text has
/// no `Content-Type` header.
#[must_use]
pub fn text_to_request_with_content_type(
    text: &str,
    default_content_type: &str,
) -> Option<ParsedHttpText> {
    let lines: Vec<&str> = text.lines().collect();
    let mut index = 0;
    let mut name = None;

    while let Some(line) = lines.get(index).map(|l| l.trim()) {
        if !line.is_empty() && !line.starts_with('#') {
            break;
        }
        if let Some(title) = line.strip_prefix("###") {
            name = Some(title.trim().to_string()).filter(|t| !t.is_empty());
        }
        index += 1;
    }

    let Some(request_line) = lines.get(index) else {
        debug!("http text has no request line");
        return None;
    };
    index += 1;

    let Some((method_token, target)) = request_line.trim().split_once(char::is_whitespace) else {
        debug!(line = %request_line.trim(), "request line needs a method and a URL");
        return None;
    };
    let url = strip_http_version(target.trim());
    let method: HttpMethod = match method_token.parse() {
        Ok(method) => method,
        Err(error) => {
            debug!(%error, "rejecting request line");
            return None;
        }
    };

    let (uri, query) = split_query(url);

    let mut headers = Headers::new();
    let mut content_type = String::new();
    while let Some(line) = lines.get(index).map(|l| l.trim()) {
        if line.is_empty() {
            break;
        }
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim();
            let value = value.trim();
            if key.eq_ignore_ascii_case("Content-Type") {
                value.clone_into(&mut content_type);
            } else if !key.is_empty() {
                headers.add(Header::new(key, value));
            }
        }
        index += 1;
    }

    while lines.get(index).is_some_and(|l| l.trim().is_empty()) {
        index += 1;
    }

    let remaining = lines.get(index..).unwrap_or_default();
    let handler_start = remaining
        .iter()
        .position(|line| line.trim_start().starts_with('>'))
        .unwrap_or(remaining.len());
    let (body_lines, handler_lines) = remaining.split_at(handler_start);

    let body = join_without_trailing_blanks(body_lines);
    let response_handler = parse_handler(handler_lines);

    if content_type.is_empty() {
        default_content_type.clone_into(&mut content_type);
    }

    debug!(
        %method,
        uri,
        headers = headers.len(),
        query = query.len(),
        body_len = body.len(),
        has_handler = response_handler.is_some(),
        "parsed http text"
    );

    Some(ParsedHttpText {
        name,
        request: HttpRequest {
            method,
            uri: uri.to_string(),
            content_type,
            body,
            headers,
            query,
            response_handler,
            auth: Vec::new(),
        },
    })
}

/// The URL runs to the end of the line, so placeholders such as `{{ id }}`
/// keep their inner spaces. A trailing `HTTP/x.y` token is dropped.
fn strip_http_version(target: &str) -> &str {
    match target.rsplit_once(char::is_whitespace) {
        Some((url, version)) if version.starts_with("HTTP/") => url.trim_end(),
        _ => target,
    }
}

fn split_query(url: &str) -> (&str, QueryParams) {
    let Some((uri, query_string)) = url.split_once('?') else {
        return (url, QueryParams::new());
    };

    let query = query_string
        .split('&')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (!key.is_empty()).then(|| {
                QueryParam::new(decode_query_component(key), decode_query_component(value))
            })
        })
        .collect();

    (uri, query)
}

fn join_without_trailing_blanks(lines: &[&str]) -> String {
    let end = lines
        .iter()
        .rposition(|line| !line.trim().is_empty())
        .map_or(0, |last| last + 1);
    lines[..end].join("\n")
}

fn parse_handler(lines: &[&str]) -> Option<String> {
    let script = lines
        .iter()
        .map(|line| {
            line.trim()
                .strip_prefix('>')
                .map_or(*line, str::trim)
        })
        .collect::<Vec<_>>()
        .join("\n");

    let script = script.trim();
    (!script.is_empty()).then(|| script.to_string())
}
