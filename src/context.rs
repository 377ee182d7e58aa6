use std::sync::Arc;

use crate::cmd_parser::{self, ParsedArgs};
use crate::commands::CommandRegistry;
use crate::input_mode::InputMode;
use crate::output::{OutputKind, Scrollback};
use crate::queue::CommandQueue;
use crate::services::Services;
use crate::session::Session;

/// Everything a handler gets for one invocation.
///
/// Built fresh for every dequeued entry. The session is a snapshot; handlers
/// that change it return the new value in their [`Effect`].
pub struct CommandContext {
    /// Lowercased command name, empty for continuations.
    pub command: String,
    /// Tokens after the command name.
    pub args: Vec<String>,
    pub line: String,
    pub automated: bool,
    pub session: Session,
    pub history: Vec<String>,
    pub services: Arc<dyn Services>,
    pub registry: Arc<CommandRegistry>,
    output: Scrollback,
    queue: CommandQueue,
}

impl CommandContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        command: String,
        args: Vec<String>,
        line: String,
        automated: bool,
        session: Session,
        history: Vec<String>,
        services: Arc<dyn Services>,
        registry: Arc<CommandRegistry>,
        output: Scrollback,
        queue: CommandQueue,
    ) -> Self {
        Self {
            command,
            args,
            line,
            automated,
            session,
            history,
            services,
            registry,
            output,
            queue,
        }
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// Arguments from `index` on, joined by single spaces.
    pub fn rest(&self, index: usize) -> String {
        self.args.get(index..).map(|a| a.join(" ")).unwrap_or_default()
    }

    pub fn parsed_args(&self) -> ParsedArgs {
        cmd_parser::split_flags(&self.args)
    }

    pub fn log(&self, kind: OutputKind, message: impl Into<String>) {
        self.output.log(kind, message);
    }

    pub fn output(&self, message: impl Into<String>) {
        self.log(OutputKind::Output, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(OutputKind::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.log(OutputKind::Success, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.log(OutputKind::Warning, message);
    }

    pub fn html(&self, markup: impl Into<String>) {
        self.log(OutputKind::Html, markup);
    }

    pub fn scrollback(&self) -> &Scrollback {
        &self.output
    }

    /// Queues another command behind everything already pending. It runs
    /// after the current handler finishes.
    pub fn execute(&self, line: &str) -> bool {
        self.queue.enqueue(line, true)
    }
}

/// State changes a handler asks the dispatcher to apply once it returns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Effect {
    pub session: Option<Session>,
    pub prompt: Option<InputMode>,
    pub clear: bool,
    pub quit: bool,
}

impl Effect {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn session(session: Session) -> Self {
        Self {
            session: Some(session),
            ..Self::default()
        }
    }

    pub fn prompt(mode: InputMode) -> Self {
        Self {
            prompt: Some(mode),
            ..Self::default()
        }
    }

    pub fn clear() -> Self {
        Self {
            clear: true,
            ..Self::default()
        }
    }

    pub fn quit() -> Self {
        Self {
            quit: true,
            ..Self::default()
        }
    }
}
