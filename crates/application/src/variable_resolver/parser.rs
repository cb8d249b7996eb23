//! Placeholder parser for `{{variable}}` syntax
//!
//! Scans strings for placeholder references and reports their positions.
//! An identifier is the trimmed text between `{{` and the next `}}`; it may
//! not contain `}`.

use std::ops::Range;

/// A placeholder reference found in a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableReference {
    /// The identifier, trimmed, without the braces.
    pub name: String,

    /// Byte range of the whole `{{ ... }}` token in the original string.
    pub span: Range<usize>,
}

impl VariableReference {
    /// Creates a new variable reference.
    #[must_use]
    pub fn new(name: impl Into<String>, span: Range<usize>) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

/// Parses a string and extracts all placeholder references in order.
///
/// Tokens whose inner text is blank are skipped and stay literal text.
///
/// # Examples
///
/// ```
/// use httpulse_application::variable_resolver::parser::parse_variables;
///
/// let refs = parse_variables("{{baseUrl}}/users/{{ id }}");
/// assert_eq!(refs.len(), 2);
/// assert_eq!(refs[0].name, "baseUrl");
/// assert_eq!(refs[1].name, "id");
/// ```
#[must_use]
pub fn parse_variables(input: &str) -> Vec<VariableReference> {
    let bytes = input.as_bytes();
    let mut references = Vec::new();
    let mut i = 0;

    while i + 1 < bytes.len() {
        if bytes[i] != b'{' || bytes[i + 1] != b'{' {
            i += 1;
            continue;
        }

        let inner_start = i + 2;
        let Some(offset) = input[inner_start..].find('}') else {
            // No closing brace anywhere after this point.
            break;
        };
        let close = inner_start + offset;

        if offset > 0 && bytes.get(close + 1) == Some(&b'}') {
            let name = input[inner_start..close].trim();
            if !name.is_empty() {
                references.push(VariableReference::new(name, i..close + 2));
            }
            i = close + 2;
        } else {
            // Lone `}` (or empty braces): not a placeholder starting here.
            i += 1;
        }
    }

    references
}

/// Returns true if the input contains at least one placeholder.
#[must_use]
pub fn has_variables(input: &str) -> bool {
    !parse_variables(input).is_empty()
}

/// Returns the distinct identifiers in order of first occurrence.
#[must_use]
pub fn extract_variable_names(input: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for reference in parse_variables(input) {
        if !names.contains(&reference.name) {
            names.push(reference.name);
        }
    }
    names
}
