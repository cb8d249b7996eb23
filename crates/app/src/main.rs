//! HTTPulse command-line entry point.
//!
//! Manages persisted environments and converts `.http` request text.

mod cli;
mod commands;
mod settings;

use std::io::Write;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use cli::Cli;
use settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config_file = cli.config.clone().or_else(Settings::default_config_file);
    let mut settings =
        Settings::load(config_file.as_deref()).context("failed to load configuration")?;
    if let Some(data_dir) = cli.data_dir {
        settings.data_dir = data_dir;
    }

    // Logs on stderr, command output on stdout.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut stdout = std::io::stdout().lock();
    let code = commands::run(cli.command, &settings, &mut stdout).await?;
    stdout.flush()?;
    Ok(code)
}
