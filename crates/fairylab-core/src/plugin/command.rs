//! Per-plugin command tables and the chat command syntax.
//!
//! A command is reachable from chat only if it is registered as
//! [`Exposure::Public`] and its name does not start with an underscore.
//! Both public and internal commands can be targeted by a deferred
//! [`Task`](crate::Task).

use std::collections::HashMap;
use std::fmt;

use regex::Regex;

use super::context::{HookContext, Invocation};
use crate::error::{PluginError, PluginResult};
use crate::response::Response;

/// Signature of a command handler.
pub type CommandFn<P> = fn(&mut P, &HookContext<'_>, &Invocation) -> PluginResult<Response>;

/// Who may invoke a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exposure {
    /// Chat and tasks.
    Public,
    /// Tasks only.
    Internal,
}

// ─── Command ─────────────────────────────────────────────────────────────────

pub struct Command<P> {
    handler: CommandFn<P>,
    exposure: Exposure,
    arity: Option<usize>,
}

impl<P> Command<P> {
    pub fn public(handler: CommandFn<P>) -> Self {
        Self {
            handler,
            exposure: Exposure::Public,
            arity: None,
        }
    }

    pub fn internal(handler: CommandFn<P>) -> Self {
        Self {
            handler,
            exposure: Exposure::Internal,
            arity: None,
        }
    }

    /// Requires exactly `n` positional arguments.
    pub fn arity(mut self, n: usize) -> Self {
        self.arity = Some(n);
        self
    }

    pub fn exposure(&self) -> Exposure {
        self.exposure
    }

    /// Checks the arity and runs the handler.
    pub fn call(
        &self,
        name: &str,
        plugin: &mut P,
        ctx: &HookContext<'_>,
        inv: &Invocation,
    ) -> PluginResult<Response> {
        if let Some(expected) = self.arity
            && expected != inv.args.len()
        {
            return Err(PluginError::Arity {
                command: name.to_owned(),
                expected,
                got: inv.args.len(),
            });
        }
        (self.handler)(plugin, ctx, inv)
    }
}

impl<P> Clone for Command<P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P> Copy for Command<P> {}

impl<P> fmt::Debug for Command<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("exposure", &self.exposure)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

// ─── CommandTable ────────────────────────────────────────────────────────────

/// Name to command map, built once when a plugin is installed.
pub struct CommandTable<P> {
    commands: HashMap<&'static str, Command<P>>,
}

impl<P> CommandTable<P> {
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
        }
    }

    pub fn command(mut self, name: &'static str, command: Command<P>) -> Self {
        self.commands.insert(name, command);
        self
    }

    pub fn public(self, name: &'static str, handler: CommandFn<P>) -> Self {
        self.command(name, Command::public(handler))
    }

    pub fn internal(self, name: &'static str, handler: CommandFn<P>) -> Self {
        self.command(name, Command::internal(handler))
    }

    /// Looks up any command, as a task would.
    pub fn get(&self, name: &str) -> Option<&Command<P>> {
        self.commands.get(name)
    }

    /// Looks up a command reachable from chat.
    pub fn get_public(&self, name: &str) -> Option<&Command<P>> {
        if name.starts_with('_') {
            return None;
        }
        self.get(name)
            .filter(|command| command.exposure == Exposure::Public)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.commands.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl<P> Default for CommandTable<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> fmt::Debug for CommandTable<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.commands.iter()).finish()
    }
}

// ─── CommandSyntax ───────────────────────────────────────────────────────────

/// A command parsed from chat text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub method: String,
    pub args: Vec<String>,
}

/// Matcher for the strict `ClassName.method(arg1,arg2)` chat syntax.
#[derive(Debug, Clone)]
pub struct CommandSyntax {
    class: String,
    pattern: Regex,
}

impl CommandSyntax {
    pub fn new(class: &str) -> PluginResult<Self> {
        let pattern = Regex::new(&format!(r"^{}\.(\w+)\(([^()]*)\)$", regex::escape(class)))?;
        Ok(Self {
            class: class.to_owned(),
            pattern,
        })
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    /// Parses `text`, returning `None` unless it is exactly one command
    /// addressed to this class.
    pub fn parse(&self, text: &str) -> Option<ParsedCommand> {
        let caps = self.pattern.captures(text.trim())?;
        let method = caps.get(1)?.as_str().to_owned();
        let raw = caps.get(2).map_or("", |m| m.as_str());
        let args = if raw.trim().is_empty() {
            Vec::new()
        } else {
            raw.split(',').map(|a| a.trim().to_owned()).collect()
        };
        Some(ParsedCommand { method, args })
    }
}
