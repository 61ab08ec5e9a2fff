use chrono::{DateTime, Datelike, Duration as ChronoDuration, Utc};
use futures::{future, TryFutureExt};
use log::{debug, info, warn};
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE},
    Client,
};
use serde::{de::DeserializeOwned, Serialize};

use kurobbs_shared::{
    ApiResponse, CheckinForm, Id, MineInfo, MineRequest, RoleList, RoleListRequest, SignInRequest,
    CHECKIN_PATH, DEFAULT_GAME_ID, MINE_PATH, ROLE_LIST_PATH, SIGN_IN_PATH,
};

use std::time::Duration;

use crate::error::{Error, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// Headers of the official Android client. `token` is added per account and
// `content-type` per request. Compression is negotiated by reqwest itself so it
// can also decode the body.
const CLIENT_HEADERS: [(&str, &str); 10] = [
    ("osversion", "Android"),
    ("devcode", "2fba3859fe9bfe9099f2696b8648c2c6"),
    ("countrycode", "CN"),
    ("ip", "10.0.2.233"),
    ("model", "2211133C"),
    ("source", "android"),
    ("lang", "zh-Hans"),
    ("version", "1.0.9"),
    ("versioncode", "1090"),
    ("user-agent", "okhttp/3.10.0"),
];

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

// `RequestBuilder::form` writes its own content-type; replacing it afterwards
// keeps the client's literal value and a single header entry.
fn form_content_type() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
    headers
}

/// One of the two independent daily actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Checkin,
    SignIn,
}

impl Action {
    pub fn name(self) -> &'static str {
        match self {
            Action::Checkin => "checkin",
            Action::SignIn => "sign_in",
        }
    }

    pub fn success_message(self) -> &'static str {
        match self {
            Action::Checkin => "签到奖励签到成功",
            Action::SignIn => "社区签到成功",
        }
    }

    pub fn failure_message(self) -> &'static str {
        match self {
            Action::Checkin => "签到奖励签到失败",
            Action::SignIn => "社区签到失败",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Failure {
    pub action: &'static str,
    pub message: String,
}

/// Outcome of every action in one run, in execution order.
#[derive(Debug, Default)]
pub struct Ledger {
    successes: Vec<(&'static str, String)>,
    failures: Vec<Failure>,
}

impl Ledger {
    pub fn record_success(&mut self, action: Action) {
        self.successes
            .push((action.name(), action.success_message().to_string()));
    }

    pub fn record_failure(&mut self, action: Action, remote_message: &str) {
        let failure = Failure {
            action: action.name(),
            message: format!("{}, {}", action.failure_message(), remote_message),
        };
        warn!("{} failed: {}", failure.action, failure.message);
        self.failures.push(failure);
    }

    pub fn successes(&self) -> &[(&'static str, String)] {
        &self.successes
    }

    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    /// Success phrases joined for display, `None` when nothing succeeded.
    pub fn summary(&self) -> Option<String> {
        if self.successes.is_empty() {
            return None;
        }
        let joined: Vec<&str> = self.successes.iter().map(|(_, m)| m.as_str()).collect();
        Some(format!("{}!", joined.join(", ")))
    }

    /// Collapses every recorded failure into one [`Error::Workflow`].
    pub fn into_result(self) -> Result<()> {
        if self.failures.is_empty() {
            return Ok(());
        }
        let joined: Vec<String> = self.failures.into_iter().map(|f| f.message).collect();
        Err(Error::Workflow(joined.join("; ")))
    }
}

/// Two-digit month as observed in Asia/Shanghai (UTC+8, no DST).
pub fn request_month(now: DateTime<Utc>) -> String {
    let local = now.naive_utc() + ChronoDuration::hours(8);
    format!("{:02}", local.month())
}

pub struct KurobbsClient {
    client: Client,
    root_url: String,
}

impl KurobbsClient {
    pub fn new(token: &str, root_url: impl Into<String>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in CLIENT_HEADERS {
            headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
        }
        let mut token = HeaderValue::from_str(token).map_err(|_| Error::InvalidToken)?;
        token.set_sensitive(true);
        headers.insert(HeaderName::from_static("token"), token);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(Error::Client)?;
        Ok(Self {
            client,
            root_url: root_url.into(),
        })
    }

    async fn post_form<F: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        form: &F,
    ) -> Result<ApiResponse<R>> {
        let url = format!("{}{}", self.root_url, path);
        let body = self
            .client
            .post(&url)
            .form(form)
            .headers(form_content_type())
            .send()
            .and_then(|r| future::ready(r.error_for_status()))
            .and_then(|r| r.bytes())
            .await
            .map_err(|source| Error::Transport {
                url: url.clone(),
                source,
            })?;
        let res: ApiResponse<R> =
            serde_json::from_slice(&body).map_err(|source| Error::Decode { url, source })?;
        debug!(
            "{} -> code={} success={:?} msg={}",
            path, res.code, res.success, res.msg
        );
        Ok(res)
    }

    pub async fn mine_info(&self) -> Result<ApiResponse<MineInfo>> {
        self.post_form(MINE_PATH, &MineRequest { kind: 1 }).await
    }

    pub async fn role_list(&self, user_id: Id) -> Result<ApiResponse<RoleList>> {
        self.post_form(
            ROLE_LIST_PATH,
            &RoleListRequest {
                query_user_id: user_id,
            },
        )
        .await
    }

    /// Account summary, then its roles, then the reward check-in for the first role.
    pub async fn checkin(&self) -> Result<ApiResponse> {
        let mine = self.mine_info().await?;
        let user_id = match mine.data {
            Some(info) => info.mine.and_then(|m| m.user_id).unwrap_or_default(),
            None => return Err(Error::Rejected(mine.msg)),
        };

        let roles = self.role_list(user_id).await?;
        let role = match roles.data {
            Some(list) => list.default_role_list.unwrap_or_default().into_iter().next(),
            None => return Err(Error::Rejected(roles.msg)),
        };
        let role = role.ok_or_else(|| Error::Rejected("未找到绑定的游戏角色".to_string()))?;

        let form = CheckinForm::from_role(&role, request_month(Utc::now()));
        self.post_form(CHECKIN_PATH, &form).await
    }

    pub async fn sign_in(&self) -> Result<ApiResponse> {
        self.post_form(
            SIGN_IN_PATH,
            &SignInRequest {
                game_id: DEFAULT_GAME_ID,
            },
        )
        .await
    }

    async fn perform(&self, action: Action) -> Result<ApiResponse> {
        match action {
            Action::Checkin => self.checkin().await,
            Action::SignIn => self.sign_in().await,
        }
    }

    /// Runs check-in then sign-in. A fatal error aborts the run; everything
    /// else lands in the returned ledger.
    pub async fn run(&self) -> Result<Ledger> {
        let mut ledger = Ledger::default();
        for action in [Action::Checkin, Action::SignIn] {
            match self.perform(action).await {
                Ok(res) if res.is_success() => {
                    info!("{}: {}", action.name(), res.msg);
                    ledger.record_success(action);
                }
                Ok(res) => ledger.record_failure(action, &res.msg),
                Err(Error::Rejected(msg)) => ledger.record_failure(action, &msg),
                Err(e) => return Err(e),
            }
        }
        Ok(ledger)
    }
}
