//! Preset environments offered on first run.

use super::variable::{Environment, EnvironmentVariable};

/// Name of the environment created when a value must be stored and none exists.
pub const DEFAULT_ENVIRONMENT_NAME: &str = "default";

/// Creates the "dev" preset pointing at a local server.
#[must_use]
pub fn dev_environment() -> Environment {
    preset(
        "dev",
        "Development environment",
        "http://localhost:3000",
        "dev_token_here",
    )
}

/// Creates the "prod" preset.
#[must_use]
pub fn prod_environment() -> Environment {
    preset(
        "prod",
        "Production environment",
        "https://api.example.com",
        "prod_token_here",
    )
}

fn preset(name: &str, description: &str, base_url: &str, token: &str) -> Environment {
    let mut env = Environment::new(name).with_description(description);
    env.upsert_variable(
        EnvironmentVariable::new("baseUrl", base_url).with_description("API base URL"),
    );
    env.upsert_variable(
        EnvironmentVariable::new("token", token).with_description("Authentication token"),
    );
    env
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid_and_inactive() {
        for env in [dev_environment(), prod_environment()] {
            assert!(env.validate().is_ok());
            assert!(!env.is_active);
            assert_eq!(env.variable_keys(), vec!["baseUrl", "token"]);
        }
    }

    #[test]
    fn test_presets_have_distinct_ids() {
        assert_ne!(dev_environment().id, prod_environment().id);
    }
}
