//! Daily leader digest.
//!
//! Reads the totals the scoreboard shadows to it. Posts the leader at the
//! start of each day, and answers "who's leading?" in chat.

use std::collections::BTreeMap;

use fairylab::framework::InstallContext;
use fairylab::prelude::*;
use serde::Deserialize;

use super::scoreboard::SCORES_KEY;

#[derive(Debug, Clone, Deserialize)]
pub struct DigestConfig {
    #[serde(default = "default_channel")]
    pub channel: String,
}

fn default_channel() -> String {
    "general".to_string()
}

pub struct Digest {
    config: DigestConfig,
    /// Leader line computed at the last setup.
    headline: Option<String>,
}

impl Digest {
    pub fn new(ctx: &InstallContext) -> PluginResult<Self> {
        Ok(Self {
            config: ctx.get_config()?,
            headline: None,
        })
    }

    pub fn headline(&self) -> Option<&str> {
        self.headline.as_deref()
    }

    /// `leader()`: posts the current headline on request.
    fn leader(&mut self, ctx: &HookContext<'_>, _: &Invocation) -> PluginResult<Response> {
        let text = self.headline.as_deref().unwrap_or("No runs recorded yet.");
        ctx.env.chat().post_message(&self.config.channel, text, &[])?;
        Ok(Response::new())
    }
}

fn headline(scores: &BTreeMap<String, i64>) -> Option<String> {
    let (team, runs) = scores.iter().max_by_key(|(_, runs)| **runs)?;
    Some(format!("{team} lead the league with {runs} runs."))
}

impl Plugin for Digest {
    const NAME: &'static str = "Digest";

    fn commands() -> CommandTable<Self> {
        CommandTable::new().command("leader", Command::public(Self::leader).arity(0))
    }

    /// Recomputes the headline from the latest shadowed totals.
    fn setup_internal(&mut self, ctx: &HookContext<'_>) -> PluginResult<Response> {
        let scores: BTreeMap<String, i64> = ctx.shadow_as(SCORES_KEY)?.unwrap_or_default();
        self.headline = headline(&scores);
        Ok(Response::new())
    }

    fn notify_internal(&mut self, ctx: &HookContext<'_>, notify: Notify) -> PluginResult<Response> {
        if notify != Notify::FairylabDay {
            return Ok(Response::new());
        }
        let Some(text) = self.headline.as_deref() else {
            return Ok(Response::new());
        };
        ctx.env
            .chat()
            .post_message(&self.config.channel, &format!("Good morning! {text}"), &[])?;
        Ok(Response::base())
    }

    fn as_messageable(&mut self) -> Option<&mut dyn Messageable> {
        Some(self)
    }
}

impl Messageable for Digest {
    fn on_message_internal(
        &mut self,
        ctx: &HookContext<'_>,
        message: &SlackMessage,
    ) -> PluginResult<Response> {
        if message.is_from_bot() || !message.text.to_lowercase().contains("who's leading") {
            return Ok(Response::new());
        }
        let text = self.headline.as_deref().unwrap_or("Nobody yet.");
        ctx.env.chat().post_message(&message.channel, text, &[])?;
        Ok(Response::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use fairylab::core::{MemoryChatClient, Renderer, ShadowMap};
    use serde_json::json;
    use std::sync::Arc;

    fn digest() -> Digest {
        Digest {
            config: DigestConfig {
                channel: "general".into(),
            },
            headline: None,
        }
    }

    #[test]
    fn test_headline_picks_leader() {
        let scores = BTreeMap::from([("Aces".to_string(), 3), ("Bats".to_string(), 8)]);
        assert_eq!(
            headline(&scores).as_deref(),
            Some("Bats lead the league with 8 runs.")
        );
        assert_eq!(headline(&BTreeMap::new()), None);
    }

    #[test]
    fn test_setup_reads_shadow() {
        let env = Environment::default();
        let mut shadow = ShadowMap::new();
        shadow.insert(SCORES_KEY.into(), json!({"Aces": 4}));
        let ctx = HookContext::new(Local::now(), &shadow, &env);
        let mut plugin = digest();

        plugin.setup_internal(&ctx).unwrap();
        assert_eq!(plugin.headline(), Some("Aces lead the league with 4 runs."));
    }

    #[test]
    fn test_new_day_posts_headline() {
        let chat = Arc::new(MemoryChatClient::default());
        let env = Environment::new(Renderer::empty()).with_chat(chat.clone());
        let shadow = ShadowMap::new();
        let ctx = HookContext::new(Local::now(), &shadow, &env);
        let mut plugin = digest();

        let response = plugin.notify_internal(&ctx, Notify::FairylabDay).unwrap();
        assert!(response.is_empty());
        assert!(chat.posts().is_empty());

        plugin.headline = Some("Aces lead the league with 4 runs.".into());
        let response = plugin.notify_internal(&ctx, Notify::FairylabDay).unwrap();
        assert_eq!(response.notify, vec![Notify::Base]);
        assert_eq!(
            chat.posts()[0].text,
            "Good morning! Aces lead the league with 4 runs."
        );
    }

    #[test]
    fn test_answers_question_but_not_bots() {
        let chat = Arc::new(MemoryChatClient::default());
        let env = Environment::new(Renderer::empty()).with_chat(chat.clone());
        let shadow = ShadowMap::new();
        let ctx = HookContext::new(Local::now(), &shadow, &env);
        let mut plugin = digest();

        let mut message = SlackMessage::text("C1", "So who's leading?");
        plugin.on_message_internal(&ctx, &message).unwrap();
        message.bot_id = Some("B1".into());
        plugin.on_message_internal(&ctx, &message).unwrap();

        let posts = chat.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].channel, "C1");
        assert_eq!(posts[0].text, "Nobody yet.");
    }
}
