//! Error types for the CLI

use thiserror::Error;

/// Main CLI error type
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session file error
    #[error("Session file error: {0}")]
    SessionFile(#[from] SessionFileError),

    /// API call failed
    #[error("{0}")]
    Api(#[from] speedrun_http_client::SpeedrunError),

    /// Invalid JSON parameters or unprintable response
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Login finished without a session
    #[error("Login failed: {0}")]
    Login(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Session file errors
#[derive(Error, Debug)]
pub enum SessionFileError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Session directory creation failed
    #[error("Session directory creation failed: {0}")]
    DirCreation(String),
}
