//! Best-effort delivery of the run result to the configured channels.
//!
//! Each channel is tried on its own; whatever goes wrong is logged as a
//! warning and never leaves [`Notifier::send`].

use futures::{future, TryFutureExt};
use log::{debug, warn};
use reqwest::{Client, Url};
use thiserror::Error;

use kurobbs_shared::{RelayMessage, RelayReply, NOTIFY_TITLE, RELAY_TAGS};

use std::time::Duration;

use crate::settings::Settings;

const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid push server url")]
    InvalidServerUrl,

    #[error("invalid send key format")]
    InvalidSendKey,

    #[error("rejected by relay: code={code} message={message}")]
    Rejected { code: i64, message: String },
}

/// Device-addressed push: `GET <server>/<device key>/<title>/<message>`.
#[derive(Clone, Debug)]
pub struct PushChannel {
    server_url: String,
    device_key: String,
}

impl PushChannel {
    pub fn new(server_url: impl Into<String>, device_key: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            device_key: device_key.into(),
        }
    }

    pub fn url(&self, title: &str, message: &str) -> Result<Url, NotifyError> {
        let mut url = Url::parse(&self.server_url).map_err(|_| NotifyError::InvalidServerUrl)?;
        url.path_segments_mut()
            .map_err(|_| NotifyError::InvalidServerUrl)?
            .pop_if_empty()
            .extend([self.device_key.as_str(), title, message]);
        Ok(url)
    }

    async fn send(&self, client: &Client, title: &str, message: &str) -> Result<(), NotifyError> {
        let url = self.url(title, message)?;
        let response = client
            .get(url)
            .send()
            .and_then(|r| future::ready(r.error_for_status()))
            .await?;
        debug!("Sent Bark notification, status={}", response.status());
        Ok(())
    }
}

/// ServerChan³ relay addressed by a single send key.
#[derive(Clone, Debug)]
pub struct RelayChannel {
    send_key: String,
    endpoint: Option<String>,
}

impl RelayChannel {
    pub fn new(send_key: impl Into<String>) -> Self {
        Self {
            send_key: send_key.into(),
            endpoint: None,
        }
    }

    /// Sends to `endpoint` instead of the address derived from the key.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn url(&self) -> Result<String, NotifyError> {
        if let Some(endpoint) = &self.endpoint {
            return Ok(endpoint.clone());
        }
        let key = &self.send_key;
        match key.strip_prefix("sctp") {
            Some(rest) => {
                let uid: String = rest.chars().take_while(char::is_ascii_digit).collect();
                if uid.is_empty() || !rest[uid.len()..].starts_with('t') {
                    return Err(NotifyError::InvalidSendKey);
                }
                Ok(format!("https://{}.push.ft07.com/send/{}.send", uid, key))
            }
            None => Ok(format!("https://sctapi.ftqq.com/{}.send", key)),
        }
    }

    async fn send(&self, client: &Client, title: &str, message: &str) -> Result<(), NotifyError> {
        let url = self.url()?;
        let reply = client
            .post(url)
            .json(&RelayMessage {
                title,
                desp: message,
                tags: RELAY_TAGS,
            })
            .send()
            .and_then(|r| future::ready(r.error_for_status()))
            .and_then(|r| r.json::<RelayReply>())
            .await?;
        if reply.code != 0 {
            return Err(NotifyError::Rejected {
                code: reply.code,
                message: reply.message,
            });
        }
        debug!("Sent ServerChan3 notification: {}", reply.message);
        Ok(())
    }
}

/// What happened to one [`Notifier::send`] call.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Dispatch {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: Vec<&'static str>,
}

pub struct Notifier {
    client: Client,
    title: String,
    push: Option<PushChannel>,
    relay: Option<RelayChannel>,
}

impl Notifier {
    pub fn new(client: Client, push: Option<PushChannel>, relay: Option<RelayChannel>) -> Self {
        Self {
            client,
            title: NOTIFY_TITLE.to_string(),
            push,
            relay,
        }
    }

    /// Enables each channel whose credentials are all present.
    pub fn from_settings(settings: &Settings) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(NOTIFY_TIMEOUT).build()?;
        let push = match (&settings.bark_server_url, &settings.bark_device_key) {
            (Some(url), Some(key)) => Some(PushChannel::new(url, key)),
            _ => None,
        };
        let relay = settings.server3_send_key.as_deref().map(RelayChannel::new);
        Ok(Self::new(client, push, relay))
    }

    pub async fn send(&self, message: &str) -> Dispatch {
        let mut dispatch = Dispatch::default();
        if let Some(push) = &self.push {
            let result = push.send(&self.client, &self.title, message).await;
            dispatch.record("Bark", result);
        }
        if let Some(relay) = &self.relay {
            let result = relay.send(&self.client, &self.title, message).await;
            dispatch.record("ServerChan3", result);
        }
        if dispatch.attempted == 0 {
            debug!("No notification channel configured; skipped sending result.");
        }
        dispatch
    }
}

impl Dispatch {
    fn record(&mut self, channel: &'static str, result: Result<(), NotifyError>) {
        self.attempted += 1;
        match result {
            Ok(()) => self.delivered += 1,
            Err(e) => {
                warn!("Failed to push {} notification: {}", channel, e);
                self.failed.push(channel);
            }
        }
    }
}
