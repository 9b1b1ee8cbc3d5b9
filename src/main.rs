use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use inflow_auth::backend::HttpBackend;
use inflow_auth::bus::{AppEvent, LocalBus};
use inflow_auth::config::ConfigError;
use inflow_auth::platform::{
    GoogleTokenRevoker, JsonFileStore, KeyValueStore, LogNotifier, MemoryNavigator, MemoryStore, Navigator, Platform,
};
use inflow_auth::{AuthConfig, AuthError, AuthProvider, BackendError, Reconciler, use_auth};
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

/// How long to wait for the profile upsert after a sign-in before exiting.
const RECONCILE_WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("backend setup failed: {0}")]
    Backend(#[from] BackendError),
    #[error("{0}")]
    Auth(#[from] AuthError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "inflow-auth", about = "Inflow auth session CLI")]
struct Cli {
    /// File the session and other client storage persist to.
    #[arg(long, env = "INFLOW_STATE_FILE", default_value = ".inflow-auth.json")]
    state_file: PathBuf,

    /// Path the simulated page is on.
    #[arg(long, default_value = "/")]
    path: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the current auth state.
    Session,
    SignUp {
        #[arg(long)]
        email: String,
        #[arg(long, env = "INFLOW_PASSWORD")]
        password: String,
        #[arg(long)]
        username: String,
    },
    SignIn {
        #[arg(long)]
        email: String,
        #[arg(long, env = "INFLOW_PASSWORD")]
        password: String,
    },
    SignOut,
    /// Print the Google authorize URL to open in a browser.
    Google,
    /// Finish an OAuth redirect from the URL the browser landed on.
    CompleteRedirect { url: String },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AuthConfig::from_env()?;

    let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(&cli.state_file));
    let backend = Arc::new(HttpBackend::new(&config, store.clone())?);
    let navigator = Arc::new(MemoryNavigator::new(&config.site_origin, &cli.path));
    let platform = Platform {
        navigator: navigator.clone(),
        local_store: store,
        session_store: Arc::new(MemoryStore::new()),
        notifier: Arc::new(LogNotifier),
        revoker: Arc::new(GoogleTokenRevoker::new()),
    };

    let current_url = match &cli.command {
        Command::CompleteRedirect { url } => url.clone(),
        _ => navigator.href(),
    };
    let bus = LocalBus::global();
    let mut changes = bus.listen();
    let reconciler = Reconciler::start(backend.clone(), backend.clone(), bus.clone(), &current_url).await;
    let redirected = reconciler.session().is_some() && matches!(cli.command, Command::CompleteRedirect { .. });

    let provider = AuthProvider::mount(backend, platform).await;
    let mut output = provider.scope(run(cli.command)).await?;

    if redirected || output.get("signed_in") == Some(&Value::Bool(true)) {
        wait_for_reconcile(&mut changes).await;
    }
    if let Value::Object(map) = &mut output {
        map.insert("state".into(), serde_json::to_value(provider.context().state())?);
        map.insert("redirects".into(), json!(navigator.redirects()));
    }

    println!("{}", serde_json::to_string_pretty(&output)?);
    reconciler.stop();
    provider.unmount();
    Ok(())
}

async fn run(command: Command) -> Result<Value, CliError> {
    let auth = use_auth()?;
    match command {
        Command::Session | Command::CompleteRedirect { .. } => Ok(json!({})),
        Command::SignUp { email, password, username } => {
            let resp = auth.sign_up(&email, &password, &username).await?;
            Ok(json!({ "signed_in": resp.session.is_some(), "response": resp }))
        }
        Command::SignIn { email, password } => {
            let resp = auth.sign_in(&email, &password).await?;
            Ok(json!({ "signed_in": true, "response": resp }))
        }
        Command::SignOut => {
            auth.sign_out().await?;
            Ok(json!({ "signed_out": true }))
        }
        Command::Google => {
            let resp = auth.sign_in_with_google().await?;
            Ok(json!({ "provider": resp.provider, "url": resp.url }))
        }
    }
}

async fn wait_for_reconcile(changes: &mut broadcast::Receiver<AppEvent>) {
    match tokio::time::timeout(RECONCILE_WAIT, changes.recv()).await {
        Ok(Ok(event)) => tracing::debug!(event = event.name(), "profile reconciled"),
        Ok(Err(e)) => tracing::warn!(error = %e, "local bus closed before reconcile"),
        Err(_) => tracing::warn!("timed out waiting for profile reconcile"),
    }
}
