//! Command-line definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Manage request environments and convert `.http` request text.
#[derive(Debug, Parser)]
#[command(name = "httpulse", version, about, long_about = None)]
pub struct Cli {
    /// Directory holding environment files (overrides the configuration)
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Configuration file [default: <config dir>/httpulse/httpulse.toml]
    #[arg(long, global = true, env = "HTTPULSE_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage environments and their variables
    #[command(subcommand)]
    Env(EnvCommand),

    /// Work with `.http` request text
    #[command(subcommand)]
    Http(HttpCommand),
}

#[derive(Debug, Subcommand)]
pub enum EnvCommand {
    /// List environments; the active one is marked with `*`
    List,

    /// Show one environment with its variables
    Show { name: String },

    /// Create an empty environment
    Create {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },

    /// Delete an environment
    Remove { name: String },

    /// Make an environment the active one
    Activate { name: String },

    /// Leave no environment active
    Deactivate,

    /// Set a variable, replacing any existing value
    Set {
        env: String,
        key: String,
        value: String,
    },

    /// Remove a variable
    Unset { env: String, key: String },

    /// Create the "dev" and "prod" presets and activate "dev"
    Defaults,
}

#[derive(Debug, Subcommand)]
pub enum HttpCommand {
    /// Rewrite request text in canonical layout (`-` reads stdin)
    Format { file: PathBuf },

    /// Substitute placeholders from the active environment
    Resolve { file: PathBuf },

    /// Convert request text to JSON
    ToJson { file: PathBuf },

    /// Convert JSON back to request text
    FromJson { file: PathBuf },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_env_set() {
        let cli = Cli::try_parse_from([
            "httpulse", "--data-dir", "/tmp/x", "env", "set", "dev", "token", "abc",
        ]);
        let Ok(cli) = cli else {
            unreachable!("arguments should parse");
        };
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/x")));
        assert!(matches!(
            cli.command,
            Command::Env(EnvCommand::Set { ref env, ref key, ref value })
                if env == "dev" && key == "token" && value == "abc"
        ));
    }

    #[test]
    fn test_parse_http_to_json() {
        let cli = Cli::try_parse_from(["httpulse", "http", "to-json", "req.http"]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Command::Http(HttpCommand::ToJson { .. }))
        ));
    }
}
