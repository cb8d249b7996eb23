//! Environment and environment variable types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::id::generate_id;

/// A single key/value pair owned by an [`Environment`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentVariable {
    /// The variable key, referenced as `{{key}}` in request text.
    pub key: String,
    /// The variable value. May be empty.
    #[serde(default)]
    pub value: String,
    /// Optional description for documentation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl EnvironmentVariable {
    /// Creates a new variable without a description.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            description: None,
        }
    }

    /// Adds a description to this variable.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Checks that the key is not blank.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidVariableKey` for an empty or whitespace-only key.
    pub fn validate(&self) -> DomainResult<()> {
        if self.key.trim().is_empty() {
            return Err(DomainError::InvalidVariableKey(self.key.clone()));
        }
        Ok(())
    }
}

const fn default_enabled() -> bool {
    true
}

/// A named, switchable set of variables used for placeholder substitution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    /// Unique identifier
    pub id: String,
    /// Environment name (e.g., "dev", "prod")
    pub name: String,
    /// Variables in declaration order. Keys are unique within the environment.
    #[serde(default)]
    pub variables: Vec<EnvironmentVariable>,
    /// Whether this environment is offered for selection
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Whether this is the active environment. At most one is active at a time.
    #[serde(default)]
    pub is_active: bool,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Environment {
    /// Creates a new, inactive, enabled environment with no variables.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: generate_id(),
            name: name.into(),
            variables: Vec::new(),
            enabled: true,
            is_active: false,
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Adds a description to this environment.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds or replaces a variable, builder style.
    #[must_use]
    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.upsert_variable(EnvironmentVariable::new(key, value));
        self
    }

    /// Validates the name and every variable key.
    ///
    /// # Errors
    ///
    /// Returns an error when the name is blank, a key is blank, or a key
    /// appears twice.
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::InvalidEnvironmentName(self.name.clone()));
        }
        if self.id.trim().is_empty() {
            return Err(DomainError::InvalidIdentifier(self.id.clone()));
        }

        let mut seen: Vec<&str> = Vec::with_capacity(self.variables.len());
        for variable in &self.variables {
            variable.validate()?;
            if seen.contains(&variable.key.as_str()) {
                return Err(DomainError::DuplicateVariableKey(variable.key.clone()));
            }
            seen.push(&variable.key);
        }
        Ok(())
    }

    /// Gets a variable by exact (case-sensitive) key.
    #[must_use]
    pub fn get_variable(&self, key: &str) -> Option<&EnvironmentVariable> {
        self.variables.iter().find(|v| v.key == key)
    }

    /// Resolves a key to its value.
    #[must_use]
    pub fn resolve(&self, key: &str) -> Option<&str> {
        self.get_variable(key).map(|v| v.value.as_str())
    }

    /// Inserts the variable, replacing one with the same key in place.
    ///
    /// Returns the replaced variable, if any.
    pub fn upsert_variable(&mut self, variable: EnvironmentVariable) -> Option<EnvironmentVariable> {
        if let Some(existing) = self.variables.iter_mut().find(|v| v.key == variable.key) {
            return Some(std::mem::replace(existing, variable));
        }
        self.variables.push(variable);
        None
    }

    /// Inserts the variable, refusing to overwrite an existing key.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::DuplicateVariableKey` if the key already exists.
    pub fn insert_variable(&mut self, variable: EnvironmentVariable) -> DomainResult<()> {
        if self.get_variable(&variable.key).is_some() {
            return Err(DomainError::DuplicateVariableKey(variable.key));
        }
        self.variables.push(variable);
        Ok(())
    }

    /// Removes a variable by key. Absent keys are ignored.
    pub fn remove_variable(&mut self, key: &str) -> Option<EnvironmentVariable> {
        let index = self.variables.iter().position(|v| v.key == key)?;
        Some(self.variables.remove(index))
    }

    /// Returns the number of variables in this environment.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// Returns all variable keys in declaration order.
    #[must_use]
    pub fn variable_keys(&self) -> Vec<&str> {
        self.variables.iter().map(|v| v.key.as_str()).collect()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new("New Environment")
    }
}
