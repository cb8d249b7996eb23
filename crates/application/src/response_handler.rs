//! Response-handler directive extraction
//!
//! A response handler is the `>` section of a request's text form. It holds
//! `{% ... %}` blocks such as:
//!
//! ```text
//! {% client.global.set("token", response.body.data.token); %}
//! ```
//!
//! This module only locates the blocks and the `set` directives inside them.
//! Evaluating the expression belongs to the caller, which then stores the
//! value with `EnvironmentStore::store_handler_value`.

use std::sync::LazyLock;

use regex::Regex;

#[allow(clippy::expect_used)]
static SCRIPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{%\s*(.*?)\s*%\}").expect("valid regex"));

#[allow(clippy::expect_used)]
static SET_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"client\.global\.set\s*\(\s*["']([^"']+)["']\s*,\s*(.+)\s*\)"#)
        .expect("valid regex")
});

/// A `client.global.set(key, expression)` call found in a script block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetDirective {
    /// The variable key to write
    pub key: String,
    /// The unevaluated value expression, e.g. `response.body.id`
    pub expression: String,
}

/// Returns the trimmed inner text of every `{% ... %}` block, in order.
#[must_use]
pub fn extract_script_blocks(script: &str) -> Vec<String> {
    SCRIPT_BLOCK
        .captures_iter(script)
        .map(|caps| caps[1].trim().to_string())
        .collect()
}

/// Returns the `set` directive of each block that has one.
#[must_use]
pub fn parse_set_directives(script: &str) -> Vec<SetDirective> {
    extract_script_blocks(script)
        .iter()
        .filter_map(|block| {
            let caps = SET_DIRECTIVE.captures(block)?;
            Some(SetDirective {
                key: caps[1].to_string(),
                expression: caps[2].trim().to_string(),
            })
        })
        .collect()
}
