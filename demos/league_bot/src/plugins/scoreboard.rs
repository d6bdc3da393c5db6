//! Run totals per team, fed from chat and rendered to `scoreboard/index.html`.
//!
//! ```text
//! Scoreboard.record(Aces,3)
//! ```
//!
//! Totals persist to a JSON file and are shadowed to the digest plugin.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use fairylab::framework::InstallContext;
use fairylab::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Shadow key the totals are published under.
pub const SCORES_KEY: &str = "scores";

/// Added to the chat message that recorded runs.
const RECORDED_REACTION: &str = "white_check_mark";

#[derive(Debug, Clone, Deserialize)]
pub struct ScoreboardConfig {
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,
    #[serde(default = "default_channel")]
    pub channel: String,
}

fn default_data_path() -> PathBuf {
    PathBuf::from("data/scoreboard.json")
}

fn default_channel() -> String {
    "general".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreboardData {
    #[serde(default)]
    pub total: BTreeMap<String, i64>,
    #[serde(default)]
    pub today: BTreeMap<String, i64>,
}

pub struct Scoreboard {
    config: ScoreboardConfig,
    data: ScoreboardData,
    dirty: bool,
}

impl Scoreboard {
    pub fn new(ctx: &InstallContext) -> PluginResult<Self> {
        let config: ScoreboardConfig = ctx.get_config()?;
        let data = load(&config.data_path)?;
        Ok(Self {
            config,
            data,
            dirty: true,
        })
    }

    pub fn data(&self) -> &ScoreboardData {
        &self.data
    }

    /// `record(team, runs)`: adds runs and schedules the announcement.
    fn record(&mut self, ctx: &HookContext<'_>, inv: &Invocation) -> PluginResult<Response> {
        let team = inv
            .str_arg(0)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| PluginError::invalid_argument("record", "missing team"))?
            .to_owned();
        let runs = inv
            .int_arg(1)
            .ok_or_else(|| PluginError::invalid_argument("record", "runs must be an integer"))?;

        let add = |totals: &BTreeMap<String, i64>| {
            totals.get(&team).copied().unwrap_or_default().checked_add(runs)
        };
        let (Some(total), Some(today)) = (add(&self.data.total), add(&self.data.today)) else {
            return Err(PluginError::invalid_argument("record", "run total out of range"));
        };
        self.data.total.insert(team.clone(), total);
        self.data.today.insert(team.clone(), today);
        self.save()?;
        self.dirty = true;

        if let Some(message) = inv.message() {
            acknowledge(ctx.env, message);
        }

        Ok(Response::base()
            .with_shadow([self.scores_shadow()])
            .with_task([Task::new("publish").arg(team)])
            .with_debug([DebugEntry::new("Recorded runs").extra("runs", runs)]))
    }

    /// `publish(team)`: posts the team's new total. Internal only.
    fn publish(&mut self, ctx: &HookContext<'_>, inv: &Invocation) -> PluginResult<Response> {
        let team = inv
            .str_arg(0)
            .ok_or_else(|| PluginError::invalid_argument("publish", "missing team"))?;
        let total = self.data.total.get(team).copied().unwrap_or_default();

        let text = format!("{team} now has {total} runs on the season.");
        let attachment = self.attachment(ctx.env, &text);
        ctx.env
            .chat()
            .post_message(&self.config.channel, &text, &[attachment])?;
        Ok(Response::new())
    }

    fn scores_shadow(&self) -> Shadow {
        Shadow::new("digest", SCORES_KEY, json!(self.data.total))
    }

    fn save(&self) -> PluginResult<()> {
        if let Some(parent) = self.config.data_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.config.data_path, serde_json::to_string_pretty(&self.data)?)?;
        Ok(())
    }
}

fn acknowledge(env: &Environment, message: &SlackMessage) {
    let Some(ts) = message.ts.as_deref() else {
        return;
    };
    if let Err(e) = env.chat().add_reaction(&message.channel, ts, RECORDED_REACTION) {
        warn!(error = %e, "Failed to react to record message");
    }
}

fn load(path: &Path) -> PluginResult<ScoreboardData> {
    if !path.exists() {
        return Ok(ScoreboardData::default());
    }
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}

impl Plugin for Scoreboard {
    const NAME: &'static str = "Scoreboard";

    fn commands() -> CommandTable<Self> {
        CommandTable::new()
            .command("record", Command::public(Self::record).arity(2))
            .command("publish", Command::internal(Self::publish).arity(1))
    }

    fn setup_internal(&mut self, ctx: &HookContext<'_>) -> PluginResult<Response> {
        fairylab::core::plugin::render(self, ctx)?;
        self.dirty = false;
        Ok(Response::new())
    }

    fn notify_internal(&mut self, _: &HookContext<'_>, notify: Notify) -> PluginResult<Response> {
        if notify != Notify::FairylabDay {
            return Ok(Response::new());
        }
        self.data.today.clear();
        self.save()?;
        self.dirty = true;
        Ok(Response::base())
    }

    fn shadow_internal(&mut self, _: &HookContext<'_>) -> PluginResult<Vec<Shadow>> {
        Ok(vec![self.scores_shadow()])
    }

    fn as_runnable(&mut self) -> Option<&mut dyn Runnable> {
        Some(self)
    }

    fn as_renderable(&mut self) -> Option<&mut dyn Renderable> {
        Some(self)
    }
}

impl Runnable for Scoreboard {
    /// Re-renders only when something changed since the last render.
    fn run_internal(&mut self, ctx: &HookContext<'_>) -> PluginResult<Response> {
        if !self.dirty {
            return Ok(Response::new());
        }
        fairylab::core::plugin::render(self, ctx)?;
        self.dirty = false;
        Ok(Response::base())
    }
}

impl Renderable for Scoreboard {
    fn title(&self) -> &str {
        "Scoreboard"
    }

    fn html(&self) -> &str {
        "scoreboard/index.html"
    }

    fn render_internal(&mut self, _: &HookContext<'_>) -> PluginResult<Vec<Artifact>> {
        let teams: Vec<_> = self
            .data
            .total
            .iter()
            .map(|(name, total)| {
                json!({
                    "name": name,
                    "total": total,
                    "today": self.data.today.get(name).copied().unwrap_or_default(),
                })
            })
            .collect();

        Ok(vec![Artifact::new(
            self.html(),
            "Season totals",
            "scoreboard.html",
            json!({ "teams": teams }),
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use fairylab::core::{MemoryChatClient, Renderer, ShadowMap};
    use std::sync::Arc;

    fn chat(args: &[&str]) -> Invocation {
        let message = SlackMessage {
            kind: "message".into(),
            channel: "G-testing".into(),
            text: format!("Scoreboard.record({})", args.join(",")),
            ts: Some("1700000000.000100".into()),
            ..SlackMessage::default()
        };
        Invocation::from_chat(args.iter().map(|a| a.to_string()).collect(), &message)
    }

    fn scoreboard(dir: &Path) -> Scoreboard {
        Scoreboard {
            config: ScoreboardConfig {
                data_path: dir.join("scoreboard.json"),
                channel: "general".into(),
            },
            data: ScoreboardData::default(),
            dirty: false,
        }
    }

    #[test]
    fn test_record_persists_and_schedules_publish() {
        let dir = tempfile::tempdir().unwrap();
        let env = Environment::default();
        let shadow = ShadowMap::new();
        let ctx = HookContext::new(Local::now(), &shadow, &env);
        let mut plugin = scoreboard(dir.path());

        let response = plugin
            .record(&ctx, &chat(&["Aces", "3"]))
            .unwrap();
        plugin
            .record(&ctx, &chat(&["Aces", "2"]))
            .unwrap();

        assert_eq!(plugin.data().total["Aces"], 5);
        assert_eq!(response.notify, vec![Notify::Base]);
        assert_eq!(response.task, vec![Task::new("publish").arg("Aces")]);
        assert_eq!(response.shadow[0].destination, "digest");

        let saved = load(&dir.path().join("scoreboard.json")).unwrap();
        assert_eq!(saved, plugin.data().clone());
    }

    #[test]
    fn test_record_rejects_bad_runs() {
        let dir = tempfile::tempdir().unwrap();
        let env = Environment::default();
        let shadow = ShadowMap::new();
        let ctx = HookContext::new(Local::now(), &shadow, &env);
        let mut plugin = scoreboard(dir.path());

        let err = plugin
            .record(&ctx, &chat(&["Aces", "many"]))
            .unwrap_err();
        assert!(matches!(err, PluginError::InvalidArgument { .. }));
    }

    #[test]
    fn test_record_rejects_overflowing_total() {
        let dir = tempfile::tempdir().unwrap();
        let env = Environment::default();
        let shadow = ShadowMap::new();
        let ctx = HookContext::new(Local::now(), &shadow, &env);
        let mut plugin = scoreboard(dir.path());
        let max = i64::MAX.to_string();

        plugin.record(&ctx, &chat(&["Aces", max.as_str()])).unwrap();
        let err = plugin.record(&ctx, &chat(&["Aces", "1"])).unwrap_err();

        assert!(matches!(err, PluginError::InvalidArgument { .. }));
        assert_eq!(plugin.data().total["Aces"], i64::MAX);
        assert_eq!(plugin.data().today["Aces"], i64::MAX);
    }

    #[test]
    fn test_record_reacts_to_triggering_message() {
        let dir = tempfile::tempdir().unwrap();
        let chat_client = Arc::new(MemoryChatClient::default());
        let env = Environment::default().with_chat(chat_client.clone());
        let shadow = ShadowMap::new();
        let ctx = HookContext::new(Local::now(), &shadow, &env);
        let mut plugin = scoreboard(dir.path());

        plugin.record(&ctx, &chat(&["Aces", "3"])).unwrap();
        let task = Invocation::new(vec![json!("Aces"), json!(1)], Default::default());
        plugin.record(&ctx, &task).unwrap();

        assert_eq!(
            chat_client.reactions(),
            vec![(
                "G-testing".to_owned(),
                "1700000000.000100".to_owned(),
                "white_check_mark".to_owned()
            )]
        );
    }

    #[test]
    fn test_publish_posts_with_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let chat = Arc::new(MemoryChatClient::default());
        let env = Environment::new(Renderer::empty())
            .with_home_url("https://fairylab.example")
            .with_chat(chat.clone());
        let shadow = ShadowMap::new();
        let ctx = HookContext::new(Local::now(), &shadow, &env);
        let mut plugin = scoreboard(dir.path());
        plugin.data.total.insert("Bats".into(), 9);

        plugin
            .publish(&ctx, &Invocation::new(vec![json!("Bats")], Default::default()))
            .unwrap();

        let posts = chat.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].channel, "general");
        assert_eq!(posts[0].text, "Bats now has 9 runs on the season.");
        assert_eq!(
            posts[0].attachments[0].title_link,
            "https://fairylab.example/scoreboard/index.html"
        );
    }

    #[test]
    fn test_new_day_clears_today() {
        let dir = tempfile::tempdir().unwrap();
        let env = Environment::default();
        let shadow = ShadowMap::new();
        let ctx = HookContext::new(Local::now(), &shadow, &env);
        let mut plugin = scoreboard(dir.path());
        plugin.data.total.insert("Aces".into(), 4);
        plugin.data.today.insert("Aces".into(), 4);

        let response = plugin.notify_internal(&ctx, Notify::FairylabDay).unwrap();
        assert_eq!(response.notify, vec![Notify::Base]);
        assert!(plugin.data().today.is_empty());
        assert_eq!(plugin.data().total["Aces"], 4);

        let response = plugin.notify_internal(&ctx, Notify::StatsplusSim).unwrap();
        assert!(response.is_empty());
    }
}
