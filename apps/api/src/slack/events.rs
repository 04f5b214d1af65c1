//! Inbound callback payloads and the decision of whether a message needs a reply.

use serde::Deserialize;

pub const RETRY_HEADER: &str = "x-slack-retry-num";

/// Body of an Events API callback.
#[derive(Debug, Deserialize)]
pub struct EventPayload {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub challenge: Option<String>,
    #[serde(default)]
    pub event: Option<MessageEvent>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MessageEvent {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(default)]
    pub thread_ts: Option<String>,
}

/// Form body of a slash command.
#[derive(Debug, Deserialize)]
pub struct SlashCommand {
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub channel_id: String,
}

/// A message the bot should answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Incoming {
    pub channel: String,
    /// Thread to answer in: the message's thread, or the message itself.
    pub thread_ts: Option<String>,
    pub user: Option<String>,
    pub text: String,
}

#[derive(Debug, PartialEq)]
pub enum EventAction {
    Challenge(String),
    Ignore(&'static str),
    Reply(Incoming),
}

/// DMs are answered as-is; channel messages only when they mention the bot.
pub fn interpret_event(payload: EventPayload, is_retry: bool, bot_user_id: Option<&str>) -> EventAction {
    if payload.kind == "url_verification" {
        return EventAction::Challenge(payload.challenge.unwrap_or_default());
    }
    if is_retry {
        return EventAction::Ignore("retry");
    }
    let Some(event) = payload.event else {
        return EventAction::Ignore("no event");
    };
    if event.bot_id.is_some() {
        return EventAction::Ignore("bot message");
    }
    if event.user.is_some() && event.user.as_deref() == bot_user_id {
        return EventAction::Ignore("own message");
    }

    let channel = event.channel.unwrap_or_default();
    let text = event.text.unwrap_or_default();
    if channel.is_empty() || text.trim().is_empty() {
        return EventAction::Ignore("missing channel or text");
    }

    let cleaned = if channel.starts_with('D') {
        text.trim().to_string()
    } else {
        let Some(bot_user_id) = bot_user_id else {
            return EventAction::Ignore("bot user id not configured");
        };
        let mention = format!("<@{bot_user_id}>");
        if !text.contains(&mention) {
            return EventAction::Ignore("not mentioned");
        }
        text.replace(&mention, "").trim().to_string()
    };
    if cleaned.is_empty() {
        return EventAction::Ignore("empty after cleaning");
    }

    EventAction::Reply(Incoming {
        channel,
        thread_ts: event.thread_ts.or(event.ts),
        user: event.user,
        text: cleaned,
    })
}
