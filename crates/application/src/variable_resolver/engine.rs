//! Variable resolution engine
//!
//! Substitutes `{{variable}}` references against a single environment.
//! Unresolved references are kept verbatim in the output.

use serde_json::Value;
use tracing::warn;

use httpulse_domain::environment::Environment;

use super::parser::{extract_variable_names, parse_variables};

/// Nesting depth past which `resolve_value_deep` stops descending.
pub const MAX_SUBSTITUTION_DEPTH: usize = 64;

/// A placeholder that was replaced, with the value used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVariable {
    /// The identifier (without `{{ }}`).
    pub name: String,
    /// The substituted value.
    pub value: String,
}

/// Result of variable resolution for a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionResult {
    /// The string with every resolvable placeholder substituted.
    pub resolved: String,

    /// Placeholders that were replaced, in order of appearance.
    pub resolved_variables: Vec<ResolvedVariable>,

    /// Identifiers that could not be resolved, in order of appearance.
    pub unresolved: Vec<String>,

    /// Whether all placeholders were resolved.
    pub is_complete: bool,
}

impl ResolutionResult {
    /// Creates a result for input with no placeholders.
    #[must_use]
    pub fn no_variables(input: &str) -> Self {
        Self {
            resolved: input.to_string(),
            resolved_variables: Vec::new(),
            unresolved: Vec::new(),
            is_complete: true,
        }
    }
}

/// Outcome of checking a text against the active environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// True when every placeholder resolves.
    pub valid: bool,
    /// Distinct unresolved identifiers in order of first occurrence.
    pub unresolved: Vec<String>,
}

/// Resolves placeholders against an optional environment.
///
/// With no environment every placeholder is unresolved.
#[derive(Debug, Clone, Copy, Default)]
pub struct VariableResolver<'a> {
    environment: Option<&'a Environment>,
}

impl<'a> VariableResolver<'a> {
    /// Creates a resolver over the given environment.
    #[must_use]
    pub const fn new(environment: Option<&'a Environment>) -> Self {
        Self { environment }
    }

    /// Returns the environment values are drawn from.
    #[must_use]
    pub const fn environment(&self) -> Option<&'a Environment> {
        self.environment
    }

    /// Resolves a single identifier to its value.
    #[must_use]
    pub fn resolve_value(&self, name: &str) -> Option<&'a str> {
        self.environment.and_then(|env| env.resolve(name))
    }

    /// Resolves all placeholders in the input string.
    #[must_use]
    pub fn resolve(&self, input: &str) -> ResolutionResult {
        let references = parse_variables(input);

        if references.is_empty() {
            return ResolutionResult::no_variables(input);
        }

        let mut resolved_variables = Vec::new();
        let mut unresolved = Vec::new();
        let mut result = String::with_capacity(input.len());
        let mut last_end = 0;

        for var_ref in &references {
            result.push_str(&input[last_end..var_ref.span.start]);

            if let Some(value) = self.resolve_value(&var_ref.name) {
                result.push_str(value);
                resolved_variables.push(ResolvedVariable {
                    name: var_ref.name.clone(),
                    value: value.to_string(),
                });
            } else {
                result.push_str(&input[var_ref.span.clone()]);
                unresolved.push(var_ref.name.clone());
            }

            last_end = var_ref.span.end;
        }

        result.push_str(&input[last_end..]);

        let is_complete = unresolved.is_empty();
        ResolutionResult {
            resolved: result,
            resolved_variables,
            unresolved,
            is_complete,
        }
    }

    /// Substitutes placeholders and returns only the resulting text.
    #[must_use]
    pub fn substitute(&self, input: &str) -> String {
        self.resolve(input).resolved
    }

    /// Applies [`Self::substitute`] to every string inside a JSON value.
    ///
    /// Object keys and non-string scalars are left untouched. Containers
    /// nested deeper than [`MAX_SUBSTITUTION_DEPTH`] are copied unchanged.
    #[must_use]
    pub fn resolve_value_deep(&self, value: &Value) -> Value {
        self.resolve_value_at(value, 0)
    }

    fn resolve_value_at(&self, value: &Value, depth: usize) -> Value {
        match value {
            Value::String(text) => Value::String(self.substitute(text)),
            Value::Array(_) | Value::Object(_) if depth >= MAX_SUBSTITUTION_DEPTH => {
                warn!(depth, "substitution depth limit reached, leaving value as is");
                value.clone()
            }
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.resolve_value_at(item, depth + 1))
                    .collect(),
            ),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, item)| (key.clone(), self.resolve_value_at(item, depth + 1)))
                    .collect(),
            ),
            Value::Null | Value::Bool(_) | Value::Number(_) => value.clone(),
        }
    }

    /// Returns the distinct identifiers that would stay unresolved.
    #[must_use]
    pub fn find_unresolved(&self, input: &str) -> Vec<String> {
        extract_variable_names(input)
            .into_iter()
            .filter(|name| self.resolve_value(name).is_none())
            .collect()
    }

    /// Checks whether every placeholder in `input` resolves.
    #[must_use]
    pub fn validate(&self, input: &str) -> ValidationReport {
        let unresolved = self.find_unresolved(input);
        ValidationReport {
            valid: unresolved.is_empty(),
            unresolved,
        }
    }
}
