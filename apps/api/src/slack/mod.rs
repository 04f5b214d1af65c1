//! Chat transport for the two bots: signature checks, event interpretation
//! and reply delivery. Callbacks are acknowledged first; replies are computed
//! in a spawned task and delivered through the Web API.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::chat::messages::{self, PIPELINE_ERROR, WORKING_PLACEHOLDER};
use crate::chat::ChatBot;
use crate::config::SlackBotConfig;

pub mod client;
pub mod events;
pub mod signature;
#[cfg(test)]
pub(crate) mod testing;

use client::ChatPoster;
use events::{Incoming, SlashCommand};

pub struct SlackBot {
    pub chat: Arc<ChatBot>,
    pub poster: Arc<dyn ChatPoster>,
    pub config: SlackBotConfig,
}

impl SlackBot {
    fn name(&self) -> &'static str {
        self.chat.stage().agent()
    }

    async fn compute_reply(&self, text: &str) -> String {
        match self.chat.reply(text).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(bot = self.name(), error_code = e.code(), "Reply failed: {e}");
                PIPELINE_ERROR.to_string()
            }
        }
    }

    /// Posts the working placeholder, then replaces it with the reply.
    /// Falls back to a new threaded message when the placeholder cannot be updated.
    pub async fn process_message(&self, incoming: Incoming) {
        let channel = incoming.channel.as_str();
        let thread_ts = incoming.thread_ts.as_deref();
        info!(
            bot = self.name(),
            channel,
            user = ?incoming.user,
            "Message received"
        );

        let placeholder = match self
            .poster
            .post_message(channel, WORKING_PLACEHOLDER, thread_ts)
            .await
        {
            Ok(ts) => Some(ts),
            Err(e) => {
                warn!(bot = self.name(), channel, "Placeholder post failed: {e}");
                None
            }
        };

        let reply = self.compute_reply(&incoming.text).await;

        if let Some(ts) = placeholder.as_deref() {
            match self.poster.update_message(channel, ts, &reply).await {
                Ok(()) => return,
                Err(e) => warn!(bot = self.name(), channel, "Placeholder update failed: {e}"),
            }
        }
        if let Err(e) = self.poster.post_message(channel, &reply, thread_ts).await {
            error!(bot = self.name(), channel, "Reply delivery failed: {e}");
        }
    }

    /// Answers a slash command privately to the caller.
    pub async fn process_slash(&self, command: SlashCommand) {
        info!(
            bot = self.name(),
            command = %command.command,
            channel = %command.channel_id,
            "Slash command received"
        );
        let text = command.text.trim();
        let reply = if text.is_empty() {
            messages::help(self.chat.stage()).to_string()
        } else {
            self.compute_reply(text).await
        };
        if let Err(e) = self
            .poster
            .post_ephemeral(&command.channel_id, &command.user_id, &reply)
            .await
        {
            error!(bot = self.name(), "Slash reply delivery failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::messages;
    use crate::chat::testing::bots;
    use crate::pipeline::summary::Stage;
    use crate::pipeline::testing::ScriptedScorer;
    use super::testing::{RecordingPoster, Sent};

    fn slack_bot(poster: Arc<RecordingPoster>) -> SlackBot {
        let h = bots(ScriptedScorer::default());
        SlackBot {
            chat: Arc::new(h.riva),
            poster,
            config: SlackBotConfig::default(),
        }
    }

    fn incoming(text: &str) -> Incoming {
        Incoming {
            channel: "C1".into(),
            thread_ts: Some("171.01".into()),
            user: Some("U1".into()),
            text: text.into(),
        }
    }

    #[tokio::test]
    async fn test_placeholder_is_replaced_with_reply() {
        let poster = Arc::new(RecordingPoster::default());
        slack_bot(poster.clone()).process_message(incoming("hi")).await;

        assert_eq!(
            poster.sent(),
            vec![
                Sent::Post {
                    channel: "C1".into(),
                    text: WORKING_PLACEHOLDER.into(),
                    thread_ts: Some("171.01".into()),
                },
                Sent::Update {
                    channel: "C1".into(),
                    ts: "1".into(),
                    text: messages::greeting(Stage::L1).into(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_update_falls_back_to_new_message() {
        let poster = Arc::new(RecordingPoster::failing_updates());
        slack_bot(poster.clone()).process_message(incoming("help")).await;

        let sent = poster.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(
            sent[1],
            Sent::Post {
                channel: "C1".into(),
                text: messages::help(Stage::L1).into(),
                thread_ts: Some("171.01".into()),
            }
        );
    }

    #[tokio::test]
    async fn test_slash_command_replies_ephemerally() {
        let poster = Arc::new(RecordingPoster::default());
        slack_bot(poster.clone())
            .process_slash(SlashCommand {
                command: "/riva".into(),
                text: "last-run-summary".into(),
                user_id: "U1".into(),
                channel_id: "C1".into(),
            })
            .await;

        assert_eq!(
            poster.sent(),
            vec![Sent::Ephemeral {
                channel: "C1".into(),
                user: "U1".into(),
                text: "No Riva L1 runs have completed yet.".into(),
            }]
        );
    }
}
