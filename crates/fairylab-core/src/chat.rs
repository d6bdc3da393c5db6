//! Chat capability handed to plugins through the [`Environment`](crate::Environment).
//!
//! Hooks run on blocking threads, so the trait is synchronous. The Slack
//! implementation lives in `fairylab-transport`.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::ChatResult;

/// A Slack message attachment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub fallback: String,
    pub title: String,
    pub title_link: String,
    pub text: String,
}

/// Outbound chat operations available to plugins.
pub trait ChatClient: Send + Sync {
    /// Posts `text` to `channel`, returning the new message timestamp.
    fn post_message(
        &self,
        channel: &str,
        text: &str,
        attachments: &[Attachment],
    ) -> ChatResult<Option<String>>;

    /// Adds an emoji reaction to the message identified by `ts`.
    fn add_reaction(&self, channel: &str, ts: &str, name: &str) -> ChatResult<()>;
}

/// A client that drops everything and always succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullChatClient;

impl ChatClient for NullChatClient {
    fn post_message(&self, _: &str, _: &str, _: &[Attachment]) -> ChatResult<Option<String>> {
        Ok(None)
    }

    fn add_reaction(&self, _: &str, _: &str, _: &str) -> ChatResult<()> {
        Ok(())
    }
}

/// A message captured by [`MemoryChatClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    pub channel: String,
    pub text: String,
    pub attachments: Vec<Attachment>,
}

/// A client that records every post in memory.
///
/// Used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryChatClient {
    posts: Mutex<Vec<PostedMessage>>,
    reactions: Mutex<Vec<(String, String, String)>>,
}

impl MemoryChatClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything posted so far.
    pub fn posts(&self) -> Vec<PostedMessage> {
        self.posts.lock().clone()
    }

    /// Snapshot of `(channel, ts, name)` reactions added so far.
    pub fn reactions(&self) -> Vec<(String, String, String)> {
        self.reactions.lock().clone()
    }
}

impl ChatClient for MemoryChatClient {
    fn post_message(
        &self,
        channel: &str,
        text: &str,
        attachments: &[Attachment],
    ) -> ChatResult<Option<String>> {
        let mut posts = self.posts.lock();
        posts.push(PostedMessage {
            channel: channel.to_owned(),
            text: text.to_owned(),
            attachments: attachments.to_vec(),
        });
        Ok(Some(format!("{}.000000", posts.len())))
    }

    fn add_reaction(&self, channel: &str, ts: &str, name: &str) -> ChatResult<()> {
        self.reactions
            .lock()
            .push((channel.to_owned(), ts.to_owned(), name.to_owned()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_client_records_posts() {
        let client = MemoryChatClient::new();
        let ts = client.post_message("C1", "hello", &[]).unwrap();
        assert_eq!(ts.as_deref(), Some("1.000000"));
        client.add_reaction("C1", "1.000000", "ok").unwrap();

        let posts = client.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].text, "hello");
        assert_eq!(client.reactions().len(), 1);
    }
}
