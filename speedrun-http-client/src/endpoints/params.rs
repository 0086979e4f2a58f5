//! Parameter payloads of catalog endpoints

use serde::Serialize;
use std::fmt;

/// Game lookup by id or url slug
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_url: Option<String>,
}

impl GameParams {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            game_id: Some(id.into()),
            game_url: None,
        }
    }

    pub fn by_url(url: impl Into<String>) -> Self {
        Self {
            game_id: None,
            game_url: Some(url.into()),
        }
    }
}

/// Selected values of one category variable
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableValues {
    pub variable_id: String,
    pub value_ids: Vec<String>,
}

/// Which runs a leaderboard shows
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardFilter {
    pub game_id: String,
    pub category_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<VariableValues>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub obsolete: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub platform_ids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub region_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emulator: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GameLeaderboardParams {
    pub params: LeaderboardFilter,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestLeaderboardParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_games: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_users: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_news: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_pages: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunParams {
    pub run_id: String,
}

/// User lookup by profile url slug
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserParams {
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// Login payload; `token` is only sent for the second-factor step
#[derive(Clone, Copy, Serialize)]
pub struct LoginParams<'a> {
    pub name: &'a str,
    pub password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<&'a str>,
}

impl fmt::Debug for LoginParams<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginParams")
            .field("name", &self.name)
            .field("password", &"<redacted>")
            .field("token", &self.token.map(|_| "<redacted>"))
            .finish()
    }
}
