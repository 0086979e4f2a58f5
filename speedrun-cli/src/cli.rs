//! CLI argument parsing using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// speedrun.com API client
#[derive(Parser, Debug)]
#[command(name = "src", about = "Call the speedrun.com v2 API", version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Per-call timeout, e.g. "30s" or "2m"
    #[arg(long, global = true, default_value = "30s", value_parser = humantime::parse_duration)]
    pub timeout: Duration,

    /// Identify yourself: sent as `speedrun-api-rs/<value>`
    #[arg(long, global = true)]
    pub user_agent: Option<String>,

    /// Where the session id is kept between runs
    #[arg(long, global = true, default_value = "~/.cache/speedrun-cli/session")]
    pub session_file: PathBuf,

    /// Use the shared anonymous transport and ignore any stored session
    #[arg(long, global = true)]
    pub anonymous: bool,

    /// Print JSON on a single line
    #[arg(short, long, global = true)]
    pub compact: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in (asks for the emailed token if required) and store the session
    Login {
        /// Account name (prompted if omitted)
        #[arg(short, long)]
        username: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Show the current session as seen by the server
    Session,

    /// Call any endpoint with JSON parameters
    Call {
        /// Endpoint name, e.g. GetGameSummary
        endpoint: String,

        /// Parameters as a JSON object
        #[arg(short, long, default_value = "{}")]
        params: String,

        /// Force a GET call
        #[arg(long, conflicts_with = "post")]
        get: bool,

        /// Force a POST call
        #[arg(long)]
        post: bool,
    },

    /// List endpoints with typed wrappers and their default verb
    Endpoints,
}
