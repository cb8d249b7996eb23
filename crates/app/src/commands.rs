//! Command execution.

use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;
use tracing::debug;

use httpulse_application::ports::{Clock, EnvironmentRepository};
use httpulse_application::{
    EnvironmentStore, ParsedHttpText, format_http_text_with_content_type, request_to_text,
    text_to_request_with_content_type,
};
use httpulse_domain::{Environment, EnvironmentVariable, HttpRequest};
use httpulse_infrastructure::{FileEnvironmentRepository, SystemClock, TokioFileSystem};

use crate::cli::{Command, EnvCommand, HttpCommand};
use crate::settings::Settings;

/// Exit code when resolved text still contains placeholders.
const UNRESOLVED_EXIT: u8 = 2;

/// JSON shape used by `http to-json` and `http from-json`.
#[derive(Debug, Serialize, Deserialize)]
struct NamedRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(flatten)]
    request: HttpRequest,
}

/// Runs one command, writing its output to `out`.
pub async fn run(
    command: Command,
    settings: &Settings,
    out: &mut impl Write,
) -> anyhow::Result<ExitCode> {
    match command {
        Command::Env(command) => {
            let store = open_store(settings).await?;
            run_env(&store, command, out).await
        }
        Command::Http(HttpCommand::Resolve { file }) => {
            let store = open_store(settings).await?;
            resolve_file(&store, &file, &settings.default_content_type, out).await
        }
        Command::Http(command) => run_http(command, settings, out).await,
    }
}

async fn open_store(
    settings: &Settings,
) -> anyhow::Result<EnvironmentStore<FileEnvironmentRepository<TokioFileSystem>, SystemClock>> {
    debug!(data_dir = %settings.data_dir.display(), "opening environment store");
    let repository = FileEnvironmentRepository::new(TokioFileSystem::new(), &settings.data_dir);
    let store = EnvironmentStore::new(repository, SystemClock::new());
    store
        .initialize()
        .await
        .context("failed to load environments")?;
    Ok(store)
}

fn find<R: EnvironmentRepository, C: Clock>(
    store: &EnvironmentStore<R, C>,
    name: &str,
) -> anyhow::Result<Environment> {
    match store.get_by_name(name) {
        Some(environment) => Ok(environment),
        None => bail!("no environment named '{name}'"),
    }
}

pub(crate) async fn run_env<R: EnvironmentRepository, C: Clock>(
    store: &EnvironmentStore<R, C>,
    command: EnvCommand,
    out: &mut impl Write,
) -> anyhow::Result<ExitCode> {
    match command {
        EnvCommand::List => {
            for env in store.list() {
                let marker = if env.is_active { '*' } else { ' ' };
                let disabled = if env.enabled { "" } else { " (disabled)" };
                writeln!(
                    out,
                    "{marker} {} [{} variables]{disabled}",
                    env.name,
                    env.variable_count()
                )?;
            }
        }
        EnvCommand::Show { name } => {
            let env = find(store, &name)?;
            writeln!(out, "{}{}", env.name, if env.is_active { " (active)" } else { "" })?;
            if let Some(description) = &env.description {
                writeln!(out, "  {description}")?;
            }
            for variable in &env.variables {
                writeln!(out, "  {} = {}", variable.key, variable.value)?;
            }
        }
        EnvCommand::Create { name, description } => {
            let mut environment = Environment::new(name);
            environment.description = description;
            let created = store.create(environment).await?;
            writeln!(out, "created {}", created.name)?;
        }
        EnvCommand::Remove { name } => {
            let env = find(store, &name)?;
            store.remove(&env.id).await?;
            writeln!(out, "removed {name}")?;
        }
        EnvCommand::Activate { name } => {
            let env = find(store, &name)?;
            store.set_active(&env.id).await?;
            writeln!(out, "active: {name}")?;
        }
        EnvCommand::Deactivate => {
            store.clear_active().await?;
            writeln!(out, "no active environment")?;
        }
        EnvCommand::Set { env, key, value } => {
            let target = find(store, &env)?;
            store
                .add_or_update_variable(&target.id, EnvironmentVariable::new(key.as_str(), value))
                .await?;
            writeln!(out, "{env}: set {key}")?;
        }
        EnvCommand::Unset { env, key } => {
            let target = find(store, &env)?;
            store.remove_variable(&target.id, &key).await?;
            writeln!(out, "{env}: unset {key}")?;
        }
        EnvCommand::Defaults => {
            for env in store.create_default_environments().await? {
                writeln!(out, "created {}", env.name)?;
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Prints the request with placeholders substituted. Comment lines are not
/// part of the request and are left out.
pub(crate) async fn resolve_file<R: EnvironmentRepository, C: Clock>(
    store: &EnvironmentStore<R, C>,
    file: &Path,
    default_content_type: &str,
    out: &mut impl Write,
) -> anyhow::Result<ExitCode> {
    let parsed = read_request(file, default_content_type).await?;
    let unresolved = store
        .validate(&request_to_text(&parsed.request, None))
        .unresolved;
    let resolved = store.resolve_request(&parsed.request)?;

    writeln!(out, "{}", request_to_text(&resolved, parsed.name.as_deref()))?;
    if unresolved.is_empty() {
        return Ok(ExitCode::SUCCESS);
    }
    writeln!(out, "# unresolved: {}", unresolved.join(", "))?;
    Ok(ExitCode::from(UNRESOLVED_EXIT))
}

async fn read_request(file: &Path, default_content_type: &str) -> anyhow::Result<ParsedHttpText> {
    let text = read_input(file).await?;
    match text_to_request_with_content_type(&text, default_content_type) {
        Some(parsed) => Ok(parsed),
        None => bail!("{} does not contain a request line", file.display()),
    }
}

async fn run_http(
    command: HttpCommand,
    settings: &Settings,
    out: &mut impl Write,
) -> anyhow::Result<ExitCode> {
    match command {
        HttpCommand::Format { file } => {
            let text = read_input(&file).await?;
            let formatted =
                format_http_text_with_content_type(&text, &settings.default_content_type);
            write!(out, "{formatted}")?;
        }
        HttpCommand::ToJson { file } => {
            let parsed = read_request(&file, &settings.default_content_type).await?;
            let named = NamedRequest {
                name: parsed.name,
                request: parsed.request,
            };
            writeln!(out, "{}", serde_json::to_string_pretty(&named)?)?;
        }
        HttpCommand::FromJson { file } => {
            let json = read_input(&file).await?;
            let mut named: NamedRequest = serde_json::from_str(&json)
                .with_context(|| format!("{} is not a request document", file.display()))?;
            if named.request.content_type.is_empty() {
                named.request.content_type.clone_from(&settings.default_content_type);
            }
            write!(out, "{}", request_to_text(&named.request, named.name.as_deref()))?;
        }
        HttpCommand::Resolve { .. } => bail!("resolve needs an environment store"),
    }
    Ok(ExitCode::SUCCESS)
}

async fn read_input(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("failed to read stdin")?;
        return Ok(text);
    }
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use httpulse_infrastructure::InMemoryEnvironmentRepository;
    use pretty_assertions::assert_eq;

    fn store() -> EnvironmentStore<InMemoryEnvironmentRepository, SystemClock> {
        EnvironmentStore::new(InMemoryEnvironmentRepository::new(), SystemClock::new())
    }

    async fn env(
        store: &EnvironmentStore<InMemoryEnvironmentRepository, SystemClock>,
        command: EnvCommand,
    ) -> String {
        let mut out = Vec::new();
        run_env(store, command, &mut out).await.expect("command");
        String::from_utf8(out).expect("utf8")
    }

    #[tokio::test]
    async fn test_defaults_then_list_marks_active() {
        let store = store();
        env(&store, EnvCommand::Defaults).await;

        let listing = env(&store, EnvCommand::List).await;

        assert_eq!(listing, "* dev [2 variables]\n  prod [2 variables]\n");
    }

    #[tokio::test]
    async fn test_set_and_unset_variable() {
        let store = store();
        env(
            &store,
            EnvCommand::Create {
                name: "staging".to_string(),
                description: None,
            },
        )
        .await;
        env(
            &store,
            EnvCommand::Set {
                env: "staging".to_string(),
                key: "token".to_string(),
                value: "abc".to_string(),
            },
        )
        .await;

        let shown = env(&store, EnvCommand::Show { name: "staging".to_string() }).await;
        assert_eq!(shown, "staging\n  token = abc\n");

        env(
            &store,
            EnvCommand::Unset {
                env: "staging".to_string(),
                key: "token".to_string(),
            },
        )
        .await;
        let env_after = store.get_by_name("staging").expect("exists");
        assert_eq!(env_after.variable_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_environment_is_an_error() {
        let store = store();
        let mut out = Vec::new();
        let result = run_env(
            &store,
            EnvCommand::Activate { name: "missing".to_string() },
            &mut out,
        )
        .await;

        assert!(result.is_err());
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_deactivate_clears_active() {
        let store = store();
        env(&store, EnvCommand::Defaults).await;
        env(&store, EnvCommand::Deactivate).await;

        assert!(store.active_environment().is_none());
    }

    #[tokio::test]
    async fn test_resolve_file_reports_unresolved() {
        let store = store();
        env(&store, EnvCommand::Defaults).await;
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("req.http");
        std::fs::write(&path, "GET {{baseUrl}}/users/{{userId}}\n").expect("write");

        let mut out = Vec::new();
        let code = resolve_file(&store, &path, "application/json", &mut out)
            .await
            .expect("resolve");

        assert_eq!(code, ExitCode::from(UNRESOLVED_EXIT));
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.ends_with("# unresolved: userId\n"));
        assert!(!text.contains("{{baseUrl}}"));
    }

    #[tokio::test]
    async fn test_resolve_file_skips_comment_lines() {
        let store = store();
        env(&store, EnvCommand::Defaults).await;
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("req.http");
        std::fs::write(&path, "# docs at {{docsUrl}}\n### Me\nGET {{baseUrl}}/me\n")
            .expect("write");

        let mut out = Vec::new();
        let code = resolve_file(&store, &path, "application/json", &mut out)
            .await
            .expect("resolve");

        assert_eq!(code, ExitCode::SUCCESS);
        let text = String::from_utf8(out).expect("utf8");
        assert_eq!(
            text,
            "### Me\nGET http://localhost:3000/me\nContent-Type: application/json\n"
        );
    }

    #[tokio::test]
    async fn test_to_json_uses_configured_content_type() {
        let dir = tempfile::tempdir().expect("tempdir");
        let http = dir.path().join("req.http");
        std::fs::write(&http, "POST /notes\n\nhello\n").expect("write");
        let settings = Settings {
            data_dir: dir.path().to_path_buf(),
            log_level: "warn".to_string(),
            default_content_type: "text/plain".to_string(),
        };

        let mut json = Vec::new();
        run_http(HttpCommand::ToJson { file: http }, &settings, &mut json)
            .await
            .expect("to-json");

        let value: serde_json::Value = serde_json::from_slice(&json).expect("json");
        assert_eq!(value["contentType"], "text/plain");
        assert_eq!(value["body"], "hello");
    }

    #[tokio::test]
    async fn test_json_round_trip_keeps_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let http = dir.path().join("req.http");
        std::fs::write(&http, "### List users\nGET https://api.test/users?page=2\n")
            .expect("write");
        let settings = Settings {
            data_dir: dir.path().to_path_buf(),
            log_level: "warn".to_string(),
            default_content_type: "application/json".to_string(),
        };

        let mut json = Vec::new();
        run_http(HttpCommand::ToJson { file: http }, &settings, &mut json)
            .await
            .expect("to-json");
        let json_path = dir.path().join("req.json");
        std::fs::write(&json_path, &json).expect("write json");

        let mut text = Vec::new();
        run_http(HttpCommand::FromJson { file: json_path }, &settings, &mut text)
            .await
            .expect("from-json");
        let text = String::from_utf8(text).expect("utf8");

        assert!(text.starts_with("### List users\nGET https://api.test/users?page=2\n"));
    }
}
