//! Argument parsing and the `send` command.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use courier_application::{BulkItem, BulkRunner, CancellationToken, SendRequest, SessionState};
use courier_domain::{
    DispatchOutcome, EngineSettings, EnvironmentVariableSet, GlobalVariableSet, RequestDraft,
};
use courier_infrastructure::{
    InMemoryHistory, NetworkStreamTransport, ReqwestHttpTransport, SandboxScriptEngine,
    SerializationError, SettingsLoader, SystemClock, read_json_file, to_json_pretty,
};
use tracing::info;

/// Send HTTP, GraphQL, WebSocket and SSE requests described as JSON drafts.
#[derive(Parser, Debug)]
#[command(name = "courier", version, about)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send one draft, or several as a bulk run
    Send(SendArgs),
}

/// Arguments of `courier send`.
#[derive(Args, Debug)]
pub struct SendArgs {
    /// Request draft file; repeat to run a bulk queue
    #[arg(short, long = "request", value_name = "DRAFT", required = true)]
    requests: Vec<PathBuf>,

    /// Environment file; the first one becomes active
    #[arg(short, long = "environment", value_name = "ENV")]
    environments: Vec<PathBuf>,

    /// Environment to activate, by name or id
    #[arg(short, long, value_name = "NAME_OR_ID")]
    active: Option<String>,

    /// Global variables file
    #[arg(short, long, value_name = "GLOBALS")]
    globals: Option<PathBuf>,

    /// Settings file (defaults to the config directory)
    #[arg(short, long, value_name = "SETTINGS", env = "COURIER_SETTINGS")]
    settings: Option<PathBuf>,
}

/// Builds the session from the files named on the command line.
async fn load_session(
    args: &SendArgs,
    settings: EngineSettings,
) -> Result<SessionState, Box<dyn std::error::Error>> {
    let session = SessionState::new(settings);

    if let Some(path) = &args.globals {
        session.set_globals(read_json_file::<GlobalVariableSet>(path).await?);
    }
    for path in &args.environments {
        session.add_environment(read_json_file::<EnvironmentVariableSet>(path).await?)?;
    }
    if let Some(active) = &args.active {
        session.set_active_environment(Some(active.as_str()))?;
    }

    Ok(session)
}

/// Renders an outcome as printed JSON; an aborted send shows as `Cancelled`.
fn display_outcome(outcome: DispatchOutcome) -> Result<String, SerializationError> {
    to_json_pretty(&outcome.into_display_response())
}

fn item_id(path: &Path, index: usize) -> String {
    path.file_stem()
        .map_or_else(|| index.to_string(), |stem| stem.to_string_lossy().into_owned())
}

/// Runs the `send` command.
pub async fn send(args: SendArgs) -> Result<(), Box<dyn std::error::Error>> {
    let loader = args
        .settings
        .as_ref()
        .map_or_else(SettingsLoader::new, SettingsLoader::with_path);
    let settings = loader.load().await?;
    let history_limit = settings.history_limit;
    let session = load_session(&args, settings).await?;

    let history = Arc::new(InMemoryHistory::new(history_limit.max(args.requests.len())));
    let dispatcher = Arc::new(SendRequest::new(
        Arc::new(ReqwestHttpTransport::new()?),
        Arc::new(NetworkStreamTransport::new()),
        Arc::new(SandboxScriptEngine::new()),
        history.clone(),
        Arc::new(SystemClock::new()),
        Arc::new(session),
    ));

    let mut drafts = Vec::with_capacity(args.requests.len());
    for path in &args.requests {
        drafts.push(read_json_file::<RequestDraft>(path).await?);
    }

    if let [draft] = drafts.as_slice() {
        let (token, cancel) = CancellationToken::new();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Cancelling request");
                token.cancel();
            }
        });

        let outcome = dispatcher.send(draft, cancel).await?;
        if outcome.is_aborted() {
            print!("{}", display_outcome(outcome)?);
            return Ok(());
        }
    } else {
        let items = args
            .requests
            .iter()
            .zip(drafts)
            .enumerate()
            .map(|(index, (path, draft))| BulkItem::new(item_id(path, index), draft))
            .collect();
        BulkRunner::new(dispatcher).run(items).await?;
    }

    let mut records = history.entries();
    records.reverse();
    print!("{}", to_json_pretty(&records)?);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_repeated_requests_are_collected() {
        let cli = Cli::parse_from([
            "courier", "send", "-r", "a.json", "--request", "b.json", "-e", "dev.json",
        ]);
        let Command::Send(args) = cli.command;
        assert_eq!(args.requests.len(), 2);
        assert_eq!(args.environments, vec![PathBuf::from("dev.json")]);
    }

    #[test]
    fn test_item_id_uses_file_stem() {
        assert_eq!(item_id(Path::new("drafts/login.json"), 3), "login");
    }

    #[test]
    fn test_aborted_send_prints_cancelled_response() {
        let printed: serde_json::Value =
            serde_json::from_str(&display_outcome(DispatchOutcome::Aborted).unwrap()).unwrap();
        assert_eq!(printed["status"], serde_json::Value::Null);
        assert_eq!(printed["statusText"], "Cancelled");
        assert_eq!(printed["data"], "Request cancelled");
        assert_eq!(printed["error"], "Cancelled");
    }
}
