use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::client::{ChatPoster, SlackError};

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Post {
        channel: String,
        text: String,
        thread_ts: Option<String>,
    },
    Update {
        channel: String,
        ts: String,
        text: String,
    },
    Ephemeral {
        channel: String,
        user: String,
        text: String,
    },
}

/// Poster that records every call. Posts return `ts` values `1`, `2`, ...
#[derive(Default)]
pub struct RecordingPoster {
    sent: Mutex<Vec<Sent>>,
    next_ts: AtomicUsize,
    fail_updates: AtomicBool,
    fail_all: AtomicBool,
}

impl RecordingPoster {
    pub fn failing_updates() -> Self {
        let poster = Self::default();
        poster.fail_updates.store(true, Ordering::SeqCst);
        poster
    }

    pub fn failing() -> Self {
        let poster = Self::default();
        poster.fail_all.store(true, Ordering::SeqCst);
        poster
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    fn check(&self, method: &'static str) -> Result<(), SlackError> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(SlackError::Api {
                method,
                error: "not_in_channel".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ChatPoster for RecordingPoster {
    async fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<String, SlackError> {
        self.check("chat.postMessage")?;
        self.sent.lock().unwrap().push(Sent::Post {
            channel: channel.into(),
            text: text.into(),
            thread_ts: thread_ts.map(str::to_string),
        });
        Ok((self.next_ts.fetch_add(1, Ordering::SeqCst) + 1).to_string())
    }

    async fn update_message(&self, channel: &str, ts: &str, text: &str) -> Result<(), SlackError> {
        self.check("chat.update")?;
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(SlackError::Api {
                method: "chat.update",
                error: "message_not_found".into(),
            });
        }
        self.sent.lock().unwrap().push(Sent::Update {
            channel: channel.into(),
            ts: ts.into(),
            text: text.into(),
        });
        Ok(())
    }

    async fn post_ephemeral(&self, channel: &str, user: &str, text: &str) -> Result<(), SlackError> {
        self.check("chat.postEphemeral")?;
        self.sent.lock().unwrap().push(Sent::Ephemeral {
            channel: channel.into(),
            user: user.into(),
            text: text.into(),
        });
        Ok(())
    }
}
