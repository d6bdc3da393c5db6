//! Template rendering and the per-process [`Environment`].
//!
//! Rendering is best-effort per artifact: a template or I/O failure for one
//! [`Artifact`] is logged and the remaining artifacts are still written.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tera::Tera;
use tracing::{debug, warn};

use crate::chat::{Attachment, ChatClient, NullChatClient};
use crate::error::{RenderError, RenderResult};

/// Format used for the `date` field merged into every render context.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S %Z";

// =============================================================================
// RenderMode
// =============================================================================

/// Where rendered pages are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// The served HTML root.
    #[default]
    Live,
    /// The golden-file root used by snapshot tests.
    Golden,
}

// =============================================================================
// Renderer
// =============================================================================

/// Thin wrapper around a [`Tera`] instance.
pub struct Renderer {
    tera: Tera,
}

impl Renderer {
    /// Loads every `*.html` template below `template_dir`.
    pub fn from_dir(template_dir: &Path) -> RenderResult<Self> {
        let pattern = template_dir.join("**/*.html");
        let tera = Tera::new(&pattern.to_string_lossy())?;
        debug!(
            count = tera.get_template_names().count(),
            dir = %template_dir.display(),
            "Loaded templates"
        );
        Ok(Self { tera })
    }

    /// A renderer with no templates.
    pub fn empty() -> Self {
        Self {
            tera: Tera::default(),
        }
    }

    /// Registers a template from a string.
    pub fn add_raw_template(&mut self, name: &str, content: &str) -> RenderResult<()> {
        self.tera.add_raw_template(name, content)?;
        Ok(())
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }

    /// Renders a registered template with a JSON object context.
    pub fn render(&self, template: &str, context: &Value) -> RenderResult<String> {
        let ctx = tera::Context::from_value(context.clone()).map_err(|_| RenderError::Context {
            template: template.to_owned(),
        })?;
        Ok(self.tera.render(template, &ctx)?)
    }

    /// Renders an unregistered template source once.
    pub fn render_str(&self, source: &str, context: &Value) -> RenderResult<String> {
        let ctx = tera::Context::from_value(context.clone()).map_err(|_| RenderError::Context {
            template: "<inline>".to_owned(),
        })?;
        Ok(Tera::one_off(source, &ctx, true)?)
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("template_count", &self.tera.get_template_names().count())
            .finish()
    }
}

// =============================================================================
// Environment
// =============================================================================

/// Process-wide capabilities handed to every plugin hook.
pub struct Environment {
    renderer: Renderer,
    html_root: PathBuf,
    golden_root: PathBuf,
    mode: RenderMode,
    testing_channel: String,
    docs_url: String,
    home_url: String,
    chat: Arc<dyn ChatClient>,
}

impl Environment {
    pub fn new(renderer: Renderer) -> Self {
        Self {
            renderer,
            html_root: PathBuf::from("html"),
            golden_root: PathBuf::from("golden"),
            mode: RenderMode::Live,
            testing_channel: String::new(),
            docs_url: String::new(),
            home_url: String::new(),
            chat: Arc::new(NullChatClient),
        }
    }

    pub fn with_html_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.html_root = root.into();
        self
    }

    pub fn with_golden_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.golden_root = root.into();
        self
    }

    pub fn with_mode(mut self, mode: RenderMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_testing_channel(mut self, channel: impl Into<String>) -> Self {
        self.testing_channel = channel.into();
        self
    }

    pub fn with_docs_url(mut self, url: impl Into<String>) -> Self {
        self.docs_url = url.into();
        self
    }

    pub fn with_home_url(mut self, url: impl Into<String>) -> Self {
        self.home_url = url.into();
        self
    }

    pub fn with_chat(mut self, chat: Arc<dyn ChatClient>) -> Self {
        self.chat = chat;
        self
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    /// Channel in which chat commands are honoured.
    pub fn testing_channel(&self) -> &str {
        &self.testing_channel
    }

    pub fn docs_url(&self) -> &str {
        &self.docs_url
    }

    pub fn home_url(&self) -> &str {
        &self.home_url
    }

    pub fn chat(&self) -> &dyn ChatClient {
        self.chat.as_ref()
    }

    /// Root directory for the current [`RenderMode`].
    pub fn output_root(&self) -> &Path {
        match self.mode {
            RenderMode::Live => &self.html_root,
            RenderMode::Golden => &self.golden_root,
        }
    }

    /// Public URL of a page relative to the HTML root.
    pub fn page_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.home_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Renders `template` with `context` and writes it below the output root.
    pub fn write_page(&self, path: &str, template: &str, context: &Value) -> RenderResult<PathBuf> {
        let html = self.renderer.render(template, context)?;
        self.write_output(path, &html)
    }

    /// Writes already rendered content below the output root.
    pub fn write_output(&self, path: &str, content: &str) -> RenderResult<PathBuf> {
        let target = self.output_root().join(path.trim_start_matches('/'));
        let write = || -> std::io::Result<()> {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&target, content)
        };
        write().map_err(|source| RenderError::Write {
            path: target.clone(),
            source,
        })?;
        Ok(target)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new(Renderer::empty())
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("renderer", &self.renderer)
            .field("html_root", &self.html_root)
            .field("golden_root", &self.golden_root)
            .field("mode", &self.mode)
            .field("testing_channel", &self.testing_channel)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Artifacts
// =============================================================================

/// One page a renderable plugin wants written.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    /// Output path relative to the output root.
    pub path: String,
    pub subtitle: String,
    pub template: String,
    /// Template context; must be a JSON object.
    pub context: Value,
}

impl Artifact {
    pub fn new(
        path: impl Into<String>,
        subtitle: impl Into<String>,
        template: impl Into<String>,
        context: Value,
    ) -> Self {
        Self {
            path: path.into(),
            subtitle: subtitle.into(),
            template: template.into(),
            context,
        }
    }
}

/// Writes each artifact, merging the shared `title`, `subtitle`, `date`,
/// `docs` and `home` fields into its context.
///
/// Returns the paths that were written. Failures are logged and skipped.
pub fn render_artifacts(
    env: &Environment,
    title: &str,
    date: DateTime<Local>,
    artifacts: Vec<Artifact>,
) -> Vec<PathBuf> {
    let date = date.format(DATE_FORMAT).to_string();
    let mut written = Vec::with_capacity(artifacts.len());

    for artifact in artifacts {
        let Artifact {
            path,
            subtitle,
            template,
            mut context,
        } = artifact;

        if let Value::Object(map) = &mut context {
            map.insert("title".into(), Value::from(title));
            map.insert("subtitle".into(), Value::from(subtitle));
            map.insert("date".into(), Value::from(date.as_str()));
            map.insert("docs".into(), Value::from(env.docs_url()));
            map.insert("home".into(), Value::from(env.home_url()));
        }

        match env.write_page(&path, &template, &context) {
            Ok(target) => {
                debug!(page = %target.display(), template = %template, "Rendered page");
                written.push(target);
            }
            Err(e) => {
                warn!(page = %path, template = %template, error = %e, "Failed to render page");
            }
        }
    }

    written
}

/// Builds a Slack attachment that links to a plugin page.
pub fn attachment(env: &Environment, title: &str, html: &str, text: &str) -> Attachment {
    Attachment {
        fallback: format!("{title}: {text}"),
        title: title.to_owned(),
        title_link: env.page_url(html),
        text: text.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn env_in(dir: &Path) -> Environment {
        let mut renderer = Renderer::empty();
        renderer
            .add_raw_template("page.html", "{{ title }}|{{ subtitle }}|{{ body }}")
            .unwrap();
        Environment::new(renderer)
            .with_html_root(dir.join("html"))
            .with_golden_root(dir.join("golden"))
            .with_home_url("https://fairylab.example/")
    }

    fn date() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 4, 1, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_render_writes_live_pages() {
        let dir = tempfile::tempdir().unwrap();
        let env = env_in(dir.path());
        let written = render_artifacts(
            &env,
            "Scores",
            date(),
            vec![Artifact::new("scores/index.html", "Today", "page.html", json!({"body": "ok"}))],
        );
        assert_eq!(written.len(), 1);
        let html = fs::read_to_string(dir.path().join("html/scores/index.html")).unwrap();
        assert_eq!(html, "Scores|Today|ok");
    }

    #[test]
    fn test_render_golden_mode_uses_golden_root() {
        let dir = tempfile::tempdir().unwrap();
        let env = env_in(dir.path()).with_mode(RenderMode::Golden);
        render_artifacts(
            &env,
            "T",
            date(),
            vec![Artifact::new("a.html", "", "page.html", json!({"body": 1}))],
        );
        assert!(dir.path().join("golden/a.html").exists());
        assert!(!dir.path().join("html/a.html").exists());
    }

    #[test]
    fn test_render_failure_does_not_abort_remaining() {
        let dir = tempfile::tempdir().unwrap();
        let env = env_in(dir.path());
        let written = render_artifacts(
            &env,
            "T",
            date(),
            vec![
                Artifact::new("missing.html", "", "nope.html", json!({})),
                Artifact::new("bad.html", "", "page.html", json!("not an object")),
                Artifact::new("good.html", "", "page.html", json!({"body": "x"})),
            ],
        );
        assert_eq!(written, vec![dir.path().join("html/good.html")]);
    }

    #[test]
    fn test_attachment_links_page() {
        let env = env_in(Path::new("/tmp"));
        let a = attachment(&env, "Scoreboard", "scores/index.html", "3 games final");
        assert_eq!(a.title_link, "https://fairylab.example/scores/index.html");
        assert_eq!(a.fallback, "Scoreboard: 3 games final");
    }

    #[test]
    fn test_render_str_one_off() {
        let renderer = Renderer::empty();
        let out = renderer.render_str("{{ n }} plugins", &json!({"n": 2})).unwrap();
        assert_eq!(out, "2 plugins");
    }
}
