//! Endpoint catalog
//!
//! Each entry of the table below becomes one async method on
//! [`SpeedrunClient`] that dispatches through [`SpeedrunClient::request`] with
//! the entry's default verb. The methods work the same on an owned instance
//! and on [`SpeedrunClient::shared`]. Any endpoint missing from the table can
//! still be called with `request` directly.

mod params;
mod responses;

pub use params::{
    GameLeaderboardParams, GameParams, LatestLeaderboardParams, LeaderboardFilter, LoginParams,
    PageParams, RunParams, SearchParams, UserParams, VariableValues,
};
pub use responses::{
    Ack, Entity, GameDataResponse, GameSummaryResponse, LatestLeaderboardResponse, Leaderboard,
    LeaderboardResponse, LoginResponse, Notification, NotificationsResponse, Pagination, Run,
    RunResponse, SearchResponse, SessionInfo, SessionResponse, StaticDataResponse,
    UserSummaryResponse,
};

use crate::client::{SpeedrunClient, Verb};
use crate::codec::NoParams;
use crate::error::SpeedrunError;

/// Name and default verb of a catalog endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointInfo {
    pub name: &'static str,
    pub verb: Verb,
}

impl EndpointInfo {
    /// Find a catalog entry by its remote name
    pub fn lookup(name: &str) -> Option<&'static EndpointInfo> {
        CATALOG.iter().find(|info| info.name == name)
    }
}

macro_rules! endpoints {
    ($(
        $(#[$meta:meta])*
        $method:ident => $name:literal ($params:ty) -> $response:ty, $verb:ident;
    )*) => {
        /// Every endpoint with a typed wrapper
        pub const CATALOG: &[EndpointInfo] = &[
            $(EndpointInfo { name: $name, verb: Verb::$verb },)*
        ];

        impl SpeedrunClient {
            $(
                $(#[$meta])*
                pub async fn $method(&self, params: &$params) -> Result<$response, SpeedrunError> {
                    self.request($name, params, Verb::$verb).await
                }
            )*
        }
    };
}

endpoints! {
    /// Session of the caller: signed-in flag, user, permissions
    get_session => "GetSession" (NoParams) -> SessionResponse, Post;
    /// Platforms, regions and other reference data
    get_static_data => "GetStaticData" (NoParams) -> StaticDataResponse, Get;
    /// Site search across games, users, news and pages
    get_search => "GetSearch" (SearchParams) -> SearchResponse, Get;
    /// Game header data by id or url
    get_game_summary => "GetGameSummary" (GameParams) -> GameSummaryResponse, Get;
    /// Full game data: categories, levels, variables
    get_game_data => "GetGameData" (GameParams) -> GameDataResponse, Get;
    /// One page of a category leaderboard
    get_game_leaderboard => "GetGameLeaderboard2" (GameLeaderboardParams) -> LeaderboardResponse, Get;
    /// Most recently verified runs
    get_latest_leaderboard => "GetLatestLeaderboard" (LatestLeaderboardParams) -> LatestLeaderboardResponse, Get;
    /// A single run with its players
    get_run => "GetRun" (RunParams) -> RunResponse, Get;
    /// Public profile summary of a user
    get_user_summary => "GetUserSummary" (UserParams) -> UserSummaryResponse, Get;
    /// Notifications of the signed-in user
    get_notifications => "GetNotifications" (PageParams) -> NotificationsResponse, Post;
    /// Credential check; prefer [`SpeedrunClient::login`] and [`SpeedrunClient::set_token`]
    put_auth_login => "PutAuthLogin" (LoginParams<'_>) -> LoginResponse, Post;
    /// Server-side logout; prefer [`SpeedrunClient::logout`]
    put_auth_logout => "PutAuthLogout" (NoParams) -> Ack, Post;
}
