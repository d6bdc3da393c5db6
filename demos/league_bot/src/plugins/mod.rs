//! Plugins compiled into the league bot.

pub mod digest;
pub mod scoreboard;

use fairylab::prelude::*;

pub use digest::Digest;
pub use scoreboard::Scoreboard;

/// Every plugin this binary knows about, in install order.
pub fn catalog() -> PluginCatalog {
    PluginCatalog::new()
        .with(PluginDescriptor::new("plugin", "scoreboard", Scoreboard::new))
        .with(PluginDescriptor::new("plugin", "digest", Digest::new))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};
    use fairylab::core::{MemoryChatClient, Renderer};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;

    const TEMPLATE: &str = "{% for team in teams %}{{ team.name }}={{ team.total }};{% endfor %}";

    fn kernel(root: &std::path::Path, chat: Arc<MemoryChatClient>) -> Fairylab {
        let mut renderer = Renderer::empty();
        renderer.add_raw_template("scoreboard.html", TEMPLATE).unwrap();
        let env = Environment::new(renderer)
            .with_html_root(root.join("html"))
            .with_testing_channel("testing")
            .with_chat(chat);
        let configs = HashMap::from([(
            "scoreboard".to_string(),
            json!({ "data_path": root.join("scoreboard.json") }),
        )]);
        Fairylab::new(catalog(), Arc::new(env)).with_plugin_configs(configs)
    }

    #[test]
    fn test_record_flows_through_shadow_and_task() {
        let dir = tempfile::tempdir().unwrap();
        let chat = Arc::new(MemoryChatClient::default());
        let mut kernel = kernel(dir.path(), chat.clone());
        let date = Local.with_ymd_and_hms(2026, 4, 1, 12, 0, 0).unwrap();

        kernel.setup(date);
        assert_eq!(kernel.registry().names(), vec!["scoreboard", "digest"]);

        let frame = json!({
            "type": "message",
            "channel": "testing",
            "text": "Scoreboard.record(Aces,3)",
        })
        .to_string();
        kernel.on_message_received(&frame, Some(date));

        let digest = kernel.registry().downcast_ref::<Digest>("digest").unwrap();
        assert_eq!(digest.headline(), Some("Aces lead the league with 3 runs."));
        assert!(chat.posts().is_empty());

        assert_eq!(kernel.drain_tasks(), 1);
        let posts = chat.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].text, "Aces now has 3 runs on the season.");

        kernel.tick(date);
        let page = std::fs::read_to_string(dir.path().join("html/scoreboard/index.html")).unwrap();
        assert_eq!(page, "Aces=3;");
        assert!(kernel.status().iter().all(|s| s.ok));
    }
}
