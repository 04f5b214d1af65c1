use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error};

use crate::errors::AppError;

const SLACK_API_BASE: &str = "https://slack.com/api";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum SlackError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{method} failed: {error}")]
    Api { method: &'static str, error: String },

    #[error("No bot token configured for {0}")]
    MissingToken(&'static str),

    #[error("{method} returned no message ts")]
    MissingTs { method: &'static str },
}

impl From<SlackError> for AppError {
    fn from(e: SlackError) -> Self {
        AppError::Chat(e.to_string())
    }
}

/// Outbound chat calls made by the bots and the batch notifier.
#[async_trait]
pub trait ChatPoster: Send + Sync {
    /// Posts a message and returns its `ts`.
    async fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<String, SlackError>;

    async fn update_message(&self, channel: &str, ts: &str, text: &str) -> Result<(), SlackError>;

    async fn post_ephemeral(&self, channel: &str, user: &str, text: &str) -> Result<(), SlackError>;
}

#[derive(Debug, Deserialize)]
struct ApiReply {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    ts: Option<String>,
}

/// Web API client for one bot.
#[derive(Clone)]
pub struct SlackClient {
    http: Client,
    bot: &'static str,
    token: Option<String>,
    base_url: String,
}

impl SlackClient {
    pub fn new(bot: &'static str, token: Option<String>) -> Result<Self, SlackError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            bot,
            token,
            base_url: SLACK_API_BASE.to_string(),
        })
    }

    async fn send(&self, method: &'static str, payload: Value) -> Result<ApiReply, SlackError> {
        let token = self.token.as_deref().ok_or(SlackError::MissingToken(self.bot))?;
        debug!(bot = self.bot, method, channel = ?payload.get("channel"), "Slack request");

        let reply: ApiReply = self
            .http
            .post(format!("{}/{method}", self.base_url))
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await?
            .json()
            .await?;

        if !reply.ok {
            let error = reply.error.unwrap_or_else(|| "unknown_error".to_string());
            error!(bot = self.bot, method, "Slack API error: {error}");
            return Err(SlackError::Api { method, error });
        }
        Ok(reply)
    }
}

#[async_trait]
impl ChatPoster for SlackClient {
    async fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<String, SlackError> {
        let mut payload = json!({ "channel": channel, "text": text });
        if let Some(ts) = thread_ts {
            payload["thread_ts"] = json!(ts);
        }
        let method = "chat.postMessage";
        self.send(method, payload)
            .await?
            .ts
            .ok_or(SlackError::MissingTs { method })
    }

    async fn update_message(&self, channel: &str, ts: &str, text: &str) -> Result<(), SlackError> {
        self.send("chat.update", json!({ "channel": channel, "ts": ts, "text": text }))
            .await
            .map(|_| ())
    }

    async fn post_ephemeral(&self, channel: &str, user: &str, text: &str) -> Result<(), SlackError> {
        self.send(
            "chat.postEphemeral",
            json!({ "channel": channel, "user": user, "text": text }),
        )
        .await
        .map(|_| ())
    }
}
