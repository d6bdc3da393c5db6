use std::collections::HashMap;

use chrono::{DateTime, Local};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{PluginError, PluginResult};
use crate::message::SlackMessage;
use crate::render::Environment;
use crate::response::Task;

/// Shadow data received from other plugins, keyed by shadow key.
pub type ShadowMap = HashMap<String, Value>;

/// Everything a hook may read besides the plugin itself.
#[derive(Debug, Clone, Copy)]
pub struct HookContext<'a> {
    /// Timestamp of the triggering event.
    pub date: DateTime<Local>,
    /// The plugin's own accumulated shadow map.
    pub shadow: &'a ShadowMap,
    pub env: &'a Environment,
}

impl<'a> HookContext<'a> {
    pub fn new(date: DateTime<Local>, shadow: &'a ShadowMap, env: &'a Environment) -> Self {
        Self { date, shadow, env }
    }

    /// Deserialises the shadow stored under `key`, if any.
    pub fn shadow_as<T: DeserializeOwned>(&self, key: &str) -> PluginResult<Option<T>> {
        self.shadow
            .get(key)
            .map(|v| T::deserialize(v).map_err(PluginError::from))
            .transpose()
    }
}

/// Arguments passed to a command handler.
///
/// Chat invocations carry string arguments, the `v` keyword set to `true` and
/// the message that typed the command; task invocations carry whatever the
/// producing [`Task`] held.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Invocation {
    pub args: Vec<Value>,
    pub kwargs: Map<String, Value>,
    pub message: Option<SlackMessage>,
}

impl Invocation {
    pub fn new(args: Vec<Value>, kwargs: Map<String, Value>) -> Self {
        Self {
            args,
            kwargs,
            message: None,
        }
    }

    /// An invocation typed in chat as `message`.
    pub fn from_chat(args: Vec<String>, message: &SlackMessage) -> Self {
        let mut kwargs = Map::new();
        kwargs.insert("v".into(), Value::Bool(true));
        Self {
            args: args.into_iter().map(Value::String).collect(),
            kwargs,
            message: Some(message.clone()),
        }
    }

    pub fn from_task(task: &Task) -> Self {
        Self::new(task.args.clone(), task.kwargs.clone())
    }

    /// The chat message that triggered this invocation, if any.
    pub fn message(&self) -> Option<&SlackMessage> {
        self.message.as_ref()
    }

    /// Whether the caller asked for verbose output (set for chat commands).
    pub fn verbose(&self) -> bool {
        self.kwargs.get("v").and_then(Value::as_bool).unwrap_or(false)
    }

    /// Positional argument `index` as a string slice.
    pub fn str_arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).and_then(Value::as_str)
    }

    /// Positional argument `index` as an integer, accepting numeric strings.
    pub fn int_arg(&self, index: usize) -> Option<i64> {
        match self.args.get(index)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_invocation_is_verbose() {
        let message = SlackMessage {
            kind: "message".into(),
            channel: "G-testing".into(),
            text: "Foo.bar(a, 7)".into(),
            ts: Some("1700000000.000100".into()),
            ..SlackMessage::default()
        };
        let inv = Invocation::from_chat(vec!["a".into(), " 7".into()], &message);
        assert!(inv.verbose());
        assert_eq!(inv.message(), Some(&message));
        assert_eq!(inv.str_arg(0), Some("a"));
        assert_eq!(inv.int_arg(1), Some(7));
        assert_eq!(inv.int_arg(2), None);
    }

    #[test]
    fn test_task_invocation_copies_arguments() {
        let task = Task::new("foo").arg(1).arg(2).kwarg("x", "y");
        let inv = Invocation::from_task(&task);
        assert_eq!(inv.args, vec![json!(1), json!(2)]);
        assert_eq!(inv.kwargs.get("x"), Some(&json!("y")));
        assert!(!inv.verbose());
        assert!(inv.message().is_none());
    }

    #[test]
    fn test_shadow_as() {
        let env = Environment::default();
        let mut shadow = ShadowMap::new();
        shadow.insert("scores".into(), json!([1, 2, 3]));
        let ctx = HookContext::new(Local::now(), &shadow, &env);

        let scores: Option<Vec<u32>> = ctx.shadow_as("scores").unwrap();
        assert_eq!(scores, Some(vec![1, 2, 3]));
        assert!(ctx.shadow_as::<Vec<u32>>("missing").unwrap().is_none());
        assert!(ctx.shadow_as::<String>("scores").is_err());
    }
}
