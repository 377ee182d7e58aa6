use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Local};
use colored::*;
use regex::Regex;
use tokio::sync::mpsc;

use crate::session::Theme;

pub const DEFAULT_SCROLLBACK_LIMIT: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// Echo of a command taken off the queue.
    Command,
    Output,
    Error,
    Success,
    Warning,
    Info,
    /// Raw markup; text front ends strip the tags.
    Html,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputLine {
    pub kind: OutputKind,
    pub content: String,
    /// Set on command echoes that came from a script or another command.
    pub automated: bool,
    pub timestamp: DateTime<Local>,
}

impl OutputLine {
    pub fn new(kind: OutputKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            automated: false,
            timestamp: Local::now(),
        }
    }

    pub fn command(line: impl Into<String>, automated: bool) -> Self {
        Self {
            automated,
            ..Self::new(OutputKind::Command, line)
        }
    }
}

/// Change notifications published to the front end.
#[derive(Debug, Clone)]
pub enum OutputEvent {
    Line(OutputLine),
    Cleared,
}

struct ScrollbackInner {
    lines: VecDeque<OutputLine>,
    limit: usize,
    listener: Option<mpsc::UnboundedSender<OutputEvent>>,
}

impl ScrollbackInner {
    fn notify(&mut self, event: OutputEvent) {
        let closed = match &self.listener {
            Some(listener) => listener.send(event).is_err(),
            None => false,
        };
        if closed {
            self.listener = None;
        }
    }
}

/// Append-only terminal scrollback shared between the dispatcher and the UI.
#[derive(Clone)]
pub struct Scrollback {
    inner: Arc<Mutex<ScrollbackInner>>,
}

impl Scrollback {
    pub fn new(limit: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ScrollbackInner {
                lines: VecDeque::new(),
                limit: limit.max(1),
                listener: None,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ScrollbackInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the receiving half of a fresh event channel, replacing any
    /// previous listener.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<OutputEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().listener = Some(tx);
        rx
    }

    pub fn push(&self, line: OutputLine) {
        let mut inner = self.lock();
        inner.notify(OutputEvent::Line(line.clone()));
        inner.lines.push_back(line);
        while inner.lines.len() > inner.limit {
            inner.lines.pop_front();
        }
    }

    pub fn log(&self, kind: OutputKind, content: impl Into<String>) {
        self.push(OutputLine::new(kind, content));
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.lines.clear();
        inner.notify(OutputEvent::Cleared);
    }

    pub fn lines(&self) -> Vec<OutputLine> {
        self.lock().lines.iter().cloned().collect()
    }
}

/// Removes markup tags and decodes the common entities.
pub fn strip_html(html: &str) -> String {
    let text = match Regex::new(r"<[^>]*>") {
        Ok(tags) => tags.replace_all(html, "").into_owned(),
        Err(_) => html.to_string(),
    };
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}

/// Renders one line for a colour terminal. Echoes take the theme's accent.
pub fn render_line(line: &OutputLine, prompt: &str, theme: Theme) -> String {
    match line.kind {
        OutputKind::Command => {
            let marker = if line.automated {
                format!("{} ", "[auto]".dimmed())
            } else {
                String::new()
            };
            format!(
                "{}{} {}",
                marker,
                prompt.color(theme.accent()).bold(),
                line.content.bright_white()
            )
        }
        OutputKind::Output => line.content.clone(),
        OutputKind::Error => line.content.red().to_string(),
        OutputKind::Success => line.content.green().to_string(),
        OutputKind::Warning => line.content.yellow().to_string(),
        OutputKind::Info => line.content.cyan().to_string(),
        OutputKind::Html => strip_html(&line.content),
    }
}
