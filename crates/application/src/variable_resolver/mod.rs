//! Variable resolution module
//!
//! Provides parsing and resolution of `{{variable}}` syntax in strings.
//!
//! # Usage
//!
//! ```
//! use httpulse_application::variable_resolver::VariableResolver;
//! use httpulse_domain::environment::Environment;
//!
//! let env = Environment::new("development").with_variable("host", "localhost");
//! let resolver = VariableResolver::new(Some(&env));
//!
//! let result = resolver.resolve("http://{{host}}/api/{{version}}");
//! assert_eq!(result.resolved, "http://localhost/api/{{version}}");
//! assert_eq!(result.unresolved, vec!["version"]);
//! ```

pub mod engine;
pub mod parser;

pub use engine::{
    MAX_SUBSTITUTION_DEPTH, ResolutionResult, ResolvedVariable, ValidationReport, VariableResolver,
};
pub use parser::{VariableReference, extract_variable_names, has_variables, parse_variables};
