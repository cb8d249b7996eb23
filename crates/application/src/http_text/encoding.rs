//! Query component encoding.
//!
//! Keys and values are percent-encoded when written and decoded when read.
//! Placeholders are copied through as-is in both directions.

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};

use crate::variable_resolver::parse_variables;

/// Characters that would change how the request line splits back apart.
const QUERY_COMPONENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'%')
    .add(b'&')
    .add(b'=')
    .add(b'#')
    .add(b'+');

/// Percent-encodes a query key or value for the request line.
#[must_use]
pub fn encode_query_component(input: &str) -> String {
    map_outside_placeholders(input, |segment| {
        utf8_percent_encode(segment, QUERY_COMPONENT).to_string()
    })
}

/// Decodes `%XX` sequences in a query key or value.
///
/// Invalid UTF-8 after decoding is replaced with U+FFFD.
#[must_use]
pub fn decode_query_component(input: &str) -> String {
    map_outside_placeholders(input, |segment| {
        percent_decode_str(segment).decode_utf8_lossy().into_owned()
    })
}

fn map_outside_placeholders(input: &str, transform: impl Fn(&str) -> String) -> String {
    let mut output = String::with_capacity(input.len());
    let mut last_end = 0;

    for reference in parse_variables(input) {
        output.push_str(&transform(&input[last_end..reference.span.start]));
        output.push_str(&input[reference.span.clone()]);
        last_end = reference.span.end;
    }

    output.push_str(&transform(&input[last_end..]));
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_encode_reserved_characters() {
        assert_eq!(encode_query_component("a b&c=d#e+f%"), "a%20b%26c%3Dd%23e%2Bf%25");
    }

    #[test]
    fn test_encode_leaves_plain_text() {
        assert_eq!(encode_query_component("abc-123_/.:~"), "abc-123_/.:~");
    }

    #[test]
    fn test_encode_skips_placeholders() {
        assert_eq!(
            encode_query_component("{{ my var }} & {{x}}"),
            "{{ my var }}%20%26%20{{x}}"
        );
    }

    #[test]
    fn test_decode() {
        assert_eq!(decode_query_component("a%20b%26c"), "a b&c");
        assert_eq!(decode_query_component("caf%C3%A9"), "café");
        assert_eq!(decode_query_component("100%"), "100%");
    }

    #[test]
    fn test_decode_keeps_plus() {
        assert_eq!(decode_query_component("a+b"), "a+b");
    }

    #[test]
    fn test_non_ascii_survives() {
        let encoded = encode_query_component("über");
        assert_eq!(encoded, "%C3%BCber");
        assert_eq!(decode_query_component(&encoded), "über");
    }
}
