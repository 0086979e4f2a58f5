//! speedrun.com HTTP Client Library
//!
//! A typed async client for the internal v2 API of speedrun.com.
//!
//! # Features
//!
//! - One generic dispatch, [`SpeedrunClient::request`], for every endpoint:
//!   POST with a JSON body, or GET with the JSON payload base64-encoded into
//!   the `_r` query parameter
//! - Session cookie (`PHPSESSID`) resumption and rotation
//! - Login with optional emailed second factor, as an explicit [`AuthState`]
//! - Typed wrappers for common endpoints, see [`endpoints`]
//! - Process-wide anonymous transport via [`SpeedrunClient::shared`]
//! - Normalized errors: every failure is a [`SpeedrunError`]
//! - Secure TLS using rustls (no OpenSSL dependencies)
//!
//! # Example
//!
//! ```no_run
//! use speedrun_http_client::{AuthState, GameParams, SpeedrunClient};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! // Anonymous reads through the shared transport
//! let summary = SpeedrunClient::shared()?
//!     .get_game_summary(&GameParams::by_url("sm64"))
//!     .await?;
//! println!("{}", summary.game.name);
//!
//! // Authenticated calls on a dedicated instance
//! let client = SpeedrunClient::new()?;
//! match client.login("alice", "secret1").await? {
//!     AuthState::AwaitingSecondFactor => {
//!         client.set_token("12345").await?;
//!     }
//!     AuthState::Authenticated => {}
//!     AuthState::Unauthenticated => return Ok(()),
//! }
//!
//! let notifications = client.get_notifications(&Default::default()).await?;
//! println!("{} notifications", notifications.notifications.len());
//!
//! client.logout().await?;
//! # Ok(())
//! # }
//! ```

mod auth;
mod client;
mod codec;
pub mod endpoints;
mod error;
mod session;

pub use auth::AuthState;
pub use client::{
    DEFAULT_BASE_URL, Diagnostic, ExecutionContext, PRODUCT_TAG, SpeedrunClient,
    SpeedrunClientBuilder, Verb,
};
pub use codec::{NoParams, QUERY_PARAM, encode_get_payload};
pub use endpoints::{
    Ack, CATALOG, EndpointInfo, GameLeaderboardParams, GameParams, LatestLeaderboardParams,
    LeaderboardFilter, LoginParams, PageParams, RunParams, SearchParams, UserParams,
    VariableValues,
};
pub use error::{SpeedrunError, UNKNOWN_ERROR};
pub use session::{SESSION_COOKIE, extract_session_id};

// Re-export reqwest for custom client builders
pub use reqwest;
