//! Error types for the speedrun.com HTTP client

use reqwest::StatusCode;
use thiserror::Error;

/// Fallback message used when a rejection carries no `error` field
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Errors that can occur when calling the speedrun.com API
///
/// Every failed remote call is normalized into one of these variants at the
/// transport boundary. Use [`SpeedrunError::status`] to get the numeric
/// classification of a remote rejection.
#[derive(Error, Debug)]
pub enum SpeedrunError {
    /// The server answered with a non-success status
    #[error("{message}")]
    Rejected {
        /// The status code that was received
        status: StatusCode,
        /// The payload's `error` field, or [`UNKNOWN_ERROR`]
        message: String,
    },

    /// No response was received (connection, DNS, TLS failure or timeout)
    #[error("Transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// Parameters could not be serialized to JSON
    #[error("Failed to encode parameters for {endpoint}: {source}")]
    Encode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    /// A successful response did not match the expected shape
    #[error("Failed to decode response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    /// `set_token` was called before any `login`
    #[error("No pending login: call login before supplying a token")]
    NoPendingLogin,

    /// Client initialization failed
    #[error("Client initialization failed: {0}")]
    ClientInit(String),
}

impl SpeedrunError {
    /// HTTP status of a remote rejection, `None` for every other failure
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            SpeedrunError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this is a transport failure caused by the per-call timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, SpeedrunError::Transport(e) if e.is_timeout())
    }

    /// Whether no response was received at all
    pub fn is_transport(&self) -> bool {
        matches!(self, SpeedrunError::Transport(_))
    }
}
