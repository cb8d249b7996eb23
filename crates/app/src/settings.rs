//! Layered configuration: defaults, then `httpulse.toml`, then `HTTPULSE_*`
//! environment variables.

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File, FileFormat};
use httpulse_domain::request::DEFAULT_CONTENT_TYPE;
use serde::Deserialize;

const APP_DIR: &str = "httpulse";
const CONFIG_FILE: &str = "httpulse.toml";
const ENV_PREFIX: &str = "HTTPULSE";

/// Runtime settings for the command-line tool.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// Directory holding `environments/*.json`
    pub data_dir: PathBuf,
    /// Log filter used when `RUST_LOG` is unset
    pub log_level: String,
    /// Content type written for requests that declare none
    pub default_content_type: String,
}

impl Settings {
    /// Loads settings, reading `config_file` if it exists.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default(
                "data_dir",
                default_data_dir().to_string_lossy().into_owned(),
            )?
            .set_default("log_level", "info")?
            .set_default("default_content_type", DEFAULT_CONTENT_TYPE)?;

        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }

        builder
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize()
    }

    /// Returns `<config dir>/httpulse/httpulse.toml`, if the platform has a
    /// config directory.
    pub fn default_config_file() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir().map_or_else(|| PathBuf::from(".httpulse"), |dir| dir.join(APP_DIR))
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = Settings::load(Some(&dir.path().join("absent.toml"))).expect("load");

        assert_eq!(settings.default_content_type, "application/json");
        assert!(!settings.log_level.is_empty());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("httpulse.toml");
        std::fs::write(
            &path,
            "data_dir = \"/srv/httpulse\"\ndefault_content_type = \"text/plain\"\n",
        )
        .expect("write config");

        let settings = Settings::load(Some(&path)).expect("load");

        assert_eq!(settings.data_dir, PathBuf::from("/srv/httpulse"));
        assert_eq!(settings.default_content_type, "text/plain");
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("httpulse.toml");
        std::fs::write(&path, "data_dir = [").expect("write config");

        assert!(Settings::load(Some(&path)).is_err());
    }
}
