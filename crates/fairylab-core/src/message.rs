//! Inbound Slack socket events.

use serde::{Deserialize, Serialize};

/// One event received over the Slack socket.
///
/// Only the fields the kernel and plugins look at are kept; anything else in
/// the payload is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackMessage {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_id: Option<String>,
}

impl SlackMessage {
    /// Parses a raw socket frame.
    pub fn parse(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// Builds a plain `message` event, mostly useful in tests.
    pub fn text(channel: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: "message".into(),
            channel: channel.into(),
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn is_message(&self) -> bool {
        self.kind == "message"
    }

    /// Returns `true` if the event was posted by a bot.
    pub fn is_from_bot(&self) -> bool {
        self.bot_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_message() {
        let raw = r#"{"type":"message","channel":"C1","text":"hi","user":"U1","ts":"1.2","team":"T1"}"#;
        let msg = SlackMessage::parse(raw).unwrap();
        assert!(msg.is_message());
        assert_eq!(msg.channel, "C1");
        assert_eq!(msg.user.as_deref(), Some("U1"));
        assert_eq!(msg.ts.as_deref(), Some("1.2"));
        assert!(!msg.is_from_bot());
    }

    #[test]
    fn test_parse_non_message_event() {
        let msg = SlackMessage::parse(r#"{"type":"hello"}"#).unwrap();
        assert!(!msg.is_message());
        assert!(msg.text.is_empty());
        assert!(msg.user.is_none());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(SlackMessage::parse("not json").is_err());
    }
}
