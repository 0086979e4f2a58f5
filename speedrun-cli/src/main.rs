//! speedrun.com CLI - log in, inspect the session and call API endpoints

mod cli;
mod config;
mod error;
mod output;
mod session_file;

use clap::Parser;
use cli::{Args, Command};
use config::Config;
use error::CliError;
use output::OutputFormatter;
use serde_json::Value;
use speedrun_http_client::{AuthState, CATALOG, EndpointInfo, NoParams, SpeedrunClient, Verb};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

/// Environment variable holding the log filter
const LOG_ENV: &str = "SRC_LOG";

#[tokio::main]
async fn main() {
    init_tracing();
    let args = Args::parse();

    if let Err(e) = run(args).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Log to stderr, filtered by `SRC_LOG` (default: warnings only)
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(args: Args) -> Result<(), CliError> {
    let config = Config::from_args(args)?;
    let formatter = OutputFormatter::new(config.compact);

    let owned;
    let client: &SpeedrunClient = if config.anonymous {
        config.shared_client()?
    } else {
        owned = config.build_client()?;
        &owned
    };

    match &config.command {
        Command::Login { username } => login(client, &config, username.clone(), &formatter).await?,
        Command::Logout => {
            client.logout().await?;
            config.session_file.remove()?;
            formatter.print_auth_state(client.auth_state());
            return Ok(());
        }
        Command::Session => {
            let session = client.get_session(&NoParams::default()).await?;
            formatter.print_json(&session)?;
        }
        Command::Call {
            endpoint,
            params,
            get,
            post,
        } => {
            let params: Value = serde_json::from_str(params)?;
            let verb = resolve_verb(endpoint, *get, *post);
            let response: Value = client.request(endpoint, &params, verb).await?;
            formatter.print_json(&response)?;
        }
        Command::Endpoints => formatter.print_endpoints(CATALOG),
    }

    persist_session(client, &config)
}

/// Interactive login with optional second factor
async fn login(
    client: &SpeedrunClient,
    config: &Config,
    username: Option<String>,
    formatter: &OutputFormatter,
) -> Result<(), CliError> {
    if config.anonymous {
        return Err(CliError::Config(
            "login needs a dedicated session; drop --anonymous".to_string(),
        ));
    }

    let username = match username {
        Some(username) => username,
        None => config::prompt_line("Username: ")?,
    };
    let password = config::prompt_password(&username)?;

    let mut state = client.login(&username, &password).await?;
    formatter.print_auth_state(state);

    if state == AuthState::AwaitingSecondFactor {
        let token = Zeroizing::new(config::prompt_line("Token: ")?);
        state = client.set_token(&token).await?;
        formatter.print_auth_state(state);
    }

    if state != AuthState::Authenticated {
        return Err(CliError::Login(
            "the server did not accept the login".to_string(),
        ));
    }
    if !client.has_session() {
        return Err(CliError::Login("no session cookie received".to_string()));
    }
    Ok(())
}

/// Verb from the flags, else the catalog's, else POST
fn resolve_verb(endpoint: &str, get: bool, post: bool) -> Verb {
    if get {
        return Verb::Get;
    }
    if post {
        return Verb::Post;
    }
    match EndpointInfo::lookup(endpoint) {
        Some(info) => info.verb,
        None => {
            warn!(endpoint, "Endpoint has no catalog entry, calling with POST");
            Verb::Post
        }
    }
}

/// Write a new or rotated session id back to the session file
fn persist_session(client: &SpeedrunClient, config: &Config) -> Result<(), CliError> {
    if config.anonymous {
        return Ok(());
    }
    let Some(current) = client.session_id() else {
        return Ok(());
    };
    let changed = config
        .session
        .as_ref()
        .is_none_or(|stored| stored.as_str() != current.as_str());
    if changed {
        config.session_file.store(&current)?;
        debug!(path = %config.session_file.path().display(), "Session stored");
    }
    Ok(())
}
