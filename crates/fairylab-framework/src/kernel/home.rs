use std::path::PathBuf;

use chrono::{DateTime, Local};
use fairylab_core::render::DATE_FORMAT;
use serde_json::json;
use tracing::{debug, warn};

use super::Fairylab;

/// Built-in home page, used unless the renderer carries a `home.html`.
pub const HOME_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head><title>{{ title }}</title></head>
<body>
<h1>{{ title }}</h1>
<table>
<tr><th>Plugin</th><th>Status</th><th>Updated</th></tr>
{% for plugin in plugins -%}
<tr class="{{ plugin.status }}"><td><a href="{{ home }}/{{ plugin.name }}/">{{ plugin.class }}</a></td><td>{{ plugin.status }}</td><td>{{ plugin.date }}</td></tr>
{% endfor -%}
</table>
<p>Updated {{ date }}.</p>
</body>
</html>
"#;

impl Fairylab {
    /// Writes `index.html` listing every plugin with its status.
    pub fn render_home(&self, date: DateTime<Local>) -> Option<PathBuf> {
        let plugins: Vec<_> = self
            .registry
            .iter()
            .map(|entry| {
                json!({
                    "name": entry.name(),
                    "class": entry.plugin().class_name(),
                    "status": if entry.ok { "ok" } else { "danger" },
                    "date": entry.date.format(DATE_FORMAT).to_string(),
                })
            })
            .collect();

        let context = json!({
            "title": "Fairylab",
            "date": date.format(DATE_FORMAT).to_string(),
            "home": self.env.home_url().trim_end_matches('/'),
            "plugins": plugins,
        });

        let renderer = self.env.renderer();
        let rendered = if renderer.has_template("home.html") {
            renderer.render("home.html", &context)
        } else {
            renderer.render_str(HOME_TEMPLATE, &context)
        };

        match rendered.and_then(|html| self.env.write_output("index.html", &html)) {
            Ok(path) => {
                debug!(page = %path.display(), "Rendered home page");
                Some(path)
            }
            Err(e) => {
                warn!(error = %e, "Failed to render home page");
                None
            }
        }
    }
}
