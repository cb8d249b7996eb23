//! Environment and variable domain types

mod presets;
mod variable;

pub use presets::{DEFAULT_ENVIRONMENT_NAME, dev_environment, prod_environment};
pub use variable::{Environment, EnvironmentVariable};
