use serde::{de::IgnoredAny, Deserialize, Serialize};

use std::fmt;

pub const ROOT_URL: &str = "https://api.kurobbs.com";

pub const MINE_PATH: &str = "/user/mineV2";
pub const ROLE_LIST_PATH: &str = "/gamer/role/default";
pub const CHECKIN_PATH: &str = "/encourage/signIn/v2";
pub const SIGN_IN_PATH: &str = "/user/signIn";

/// Game id used when a role entry carries none, and for the community sign-in.
pub const DEFAULT_GAME_ID: i64 = 2;

pub const NOTIFY_TITLE: &str = "库街区自动签到任务";
pub const RELAY_TAGS: &str = "Github Action|库街区";

/// Envelope shared by every kurobbs endpoint.
///
/// `success` is only sent by some endpoints and `data` only on success, so both
/// are optional. Anything other than `Some(true)` counts as not successful.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T = IgnoredAny> {
    pub code: i64,
    pub msg: String,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn is_success(&self) -> bool {
        self.success == Some(true)
    }
}

/// Identifiers come back as numbers from some endpoints and strings from others.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Id {
    Number(i64),
    Text(String),
}

impl Default for Id {
    fn default() -> Self {
        Id::Number(0)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Number(n) => write!(f, "{}", n),
            Id::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MineInfo {
    #[serde(default)]
    pub mine: Option<Mine>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mine {
    #[serde(default)]
    pub user_id: Option<Id>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleList {
    #[serde(default)]
    pub default_role_list: Option<Vec<Role>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    #[serde(default)]
    pub game_id: Option<Id>,
    #[serde(default)]
    pub server_id: Option<Id>,
    #[serde(default)]
    pub role_id: Option<Id>,
    #[serde(default)]
    pub user_id: Option<Id>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MineRequest {
    #[serde(rename = "type")]
    pub kind: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleListRequest {
    pub query_user_id: Id,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    pub game_id: i64,
}

/// Body of the reward check-in call. A role without a server id leaves
/// `serverId` out of the form entirely.
#[derive(Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinForm {
    pub game_id: Id,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_id: Option<Id>,
    pub role_id: Id,
    pub user_id: Id,
    pub req_month: String,
}

impl CheckinForm {
    pub fn from_role(role: &Role, req_month: String) -> Self {
        Self {
            game_id: role
                .game_id
                .clone()
                .unwrap_or(Id::Number(DEFAULT_GAME_ID)),
            server_id: role.server_id.clone(),
            role_id: role.role_id.clone().unwrap_or_default(),
            user_id: role.user_id.clone().unwrap_or_default(),
            req_month,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RelayMessage<'a> {
    pub title: &'a str,
    pub desp: &'a str,
    pub tags: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct RelayReply {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}
