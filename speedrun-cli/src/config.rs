//! Configuration resolution from CLI args

use crate::cli::{Args, Command};
use crate::error::CliError;
use crate::session_file::SessionFile;
use speedrun_http_client::SpeedrunClient;
use std::path::{Path, PathBuf};
use std::time::Duration;
use zeroize::Zeroizing;

/// Environment variable that overrides the stored session
pub const SESSION_ENV: &str = "SRC_SESSION";

/// Resolved runtime configuration
pub struct Config {
    /// Per-call timeout
    pub timeout: Duration,
    /// User agent suffix
    pub user_agent: Option<String>,
    /// Session file location
    pub session_file: SessionFile,
    /// Whether to use the shared anonymous transport
    pub anonymous: bool,
    /// Single-line JSON output
    pub compact: bool,
    /// Session to resume (zeroized on drop)
    pub session: Option<Zeroizing<String>>,
    /// Command to run
    pub command: Command,
}

impl Config {
    /// Build config from CLI args, resolving the session to resume
    pub fn from_args(args: Args) -> Result<Self, CliError> {
        let session_file = SessionFile::new(expand_tilde(&args.session_file));

        let session = if args.anonymous {
            None
        } else {
            resolve_session(std::env::var(SESSION_ENV).ok(), &session_file)?
        };

        Ok(Config {
            timeout: args.timeout,
            user_agent: args.user_agent,
            session_file,
            anonymous: args.anonymous,
            compact: args.compact,
            session,
            command: args.command,
        })
    }

    /// Dedicated client resuming the configured session
    pub fn build_client(&self) -> Result<SpeedrunClient, CliError> {
        let mut builder = SpeedrunClient::builder().timeout(self.timeout);
        if let Some(suffix) = &self.user_agent {
            builder = builder.user_agent_suffix(suffix.clone());
        }
        if let Some(session) = &self.session {
            builder = builder.session(session.as_str());
        }
        Ok(builder.build()?)
    }

    /// Shared anonymous client configured with the CLI's timeout and user agent
    pub fn shared_client(&self) -> Result<&'static SpeedrunClient, CliError> {
        let mut builder = SpeedrunClient::builder().timeout(self.timeout);
        if let Some(suffix) = &self.user_agent {
            builder = builder.user_agent_suffix(suffix.clone());
        }
        // Already installed only if called twice; the first one wins
        let _ = SpeedrunClient::install_shared(builder.build()?);
        Ok(SpeedrunClient::shared()?)
    }
}

/// Expand ~ to home directory
fn expand_tilde(path: &Path) -> PathBuf {
    if let Some(path_str) = path.to_str()
        && (path_str.starts_with("~/") || path_str == "~")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(path_str.trim_start_matches('~').trim_start_matches('/'));
    }
    path.to_path_buf()
}

/// Session from the environment, else from the session file
fn resolve_session(
    env_session: Option<String>,
    session_file: &SessionFile,
) -> Result<Option<Zeroizing<String>>, CliError> {
    match env_session {
        Some(s) if !s.trim().is_empty() => Ok(Some(Zeroizing::new(s.trim().to_string()))),
        _ => Ok(session_file.load()?),
    }
}

/// Prompt for a line of visible input
pub fn prompt_line(prompt: &str) -> Result<String, CliError> {
    use std::io::Write;
    print!("{}", prompt);
    std::io::stdout().flush().ok();

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;

    let input = input.trim().to_string();
    if input.is_empty() {
        return Err(CliError::Config("Input is required.".to_string()));
    }
    Ok(input)
}

/// Prompt for the account password without echo
pub fn prompt_password(username: &str) -> Result<Zeroizing<String>, CliError> {
    let s = Zeroizing::new(rpassword::prompt_password(format!("Password for {}: ", username))?);
    if s.is_empty() {
        return Err(CliError::Config("Password is required.".to_string()));
    }
    Ok(s)
}
