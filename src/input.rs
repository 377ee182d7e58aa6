use std::borrow::Cow;
use std::sync::Arc;

use anyhow::Result;
use colored::*;
use reedline::{
    default_vi_insert_keybindings, default_vi_normal_keybindings, ColumnarMenu, Completer,
    EditCommand, KeyCode, KeyModifiers, Keybindings, MenuBuilder, Prompt, PromptEditMode,
    PromptHistorySearch, PromptHistorySearchStatus, PromptViMode, Reedline, ReedlineEvent,
    ReedlineMenu, Signal, Span, Suggestion, ValidationResult, Validator, Vi,
};

use crate::cmd_parser;
use crate::commands::CommandRegistry;
use crate::history::Direction;
use crate::input_mode::InputMode;
use crate::session::Theme;

const COMPLETION_MENU: &str = "completion_menu";

// Host commands for the arrow keys. The NUL prefix cannot come from typed input.
const HISTORY_UP: &str = "\u{0}history-up";
const HISTORY_DOWN: &str = "\u{0}history-down";

/// What one call to [`read_line`] produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    /// Up or Down was pressed; the caller supplies the recalled entry.
    Navigate(Direction),
    /// Ctrl+C or Ctrl+D.
    Exit,
}

// Keeps the editor open while a quote is unclosed
pub struct OmegaValidator;

impl Validator for OmegaValidator {
    fn validate(&self, line: &str) -> ValidationResult {
        if cmd_parser::has_unclosed_quote(line) {
            ValidationResult::Incomplete
        } else {
            ValidationResult::Complete
        }
    }
}

/// Completes the command name (first word) through the registry.
pub struct OmegaCompleter {
    registry: Arc<CommandRegistry>,
}

impl OmegaCompleter {
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self { registry }
    }
}

impl Completer for OmegaCompleter {
    fn complete(&mut self, line: &str, pos: usize) -> Vec<Suggestion> {
        let head = line.get(..pos).unwrap_or(line);
        if head.contains(char::is_whitespace) {
            return Vec::new();
        }

        let completion = self.registry.autocomplete(head);
        let values = match completion.completed {
            Some(completed) => vec![completed.trim_end().to_string()],
            None => completion.matches,
        };
        values
            .into_iter()
            .map(|value| Suggestion {
                value,
                span: Span::new(0, head.len()),
                append_whitespace: true,
                ..Suggestion::default()
            })
            .collect()
    }
}

// Shows the configured prompt, or the pending input mode while one is set
pub struct OmegaPrompt {
    prompt: String,
    mode: InputMode,
    theme: Theme,
}

impl OmegaPrompt {
    pub fn new(prompt: impl Into<String>, mode: InputMode, theme: Theme) -> Self {
        Self {
            prompt: prompt.into(),
            mode,
            theme,
        }
    }
}

impl Prompt for OmegaPrompt {
    fn render_prompt_left(&self) -> Cow<str> {
        if self.mode.is_normal() {
            format!("{} ", self.prompt)
                .color(self.theme.accent())
                .bold()
                .to_string()
                .into()
        } else {
            format!("[{}] ", self.mode.label()).yellow().bold().to_string().into()
        }
    }

    fn render_prompt_right(&self) -> Cow<str> {
        "".into()
    }

    fn render_prompt_indicator(&self, edit_mode: PromptEditMode) -> Cow<str> {
        match edit_mode {
            PromptEditMode::Vi(PromptViMode::Normal) => "[N] ".dimmed().to_string().into(),
            PromptEditMode::Vi(PromptViMode::Insert) => "› ".green().to_string().into(),
            _ => "› ".bright_green().bold().to_string().into(),
        }
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<str> {
        "... ".dimmed().to_string().into()
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };
        format!("({}reverse-search: {}) ", prefix, history_search.term).into()
    }
}

fn bind_shared_keys(keybindings: &mut Keybindings) {
    keybindings.add_binding(
        KeyModifiers::CONTROL,
        KeyCode::Char('l'),
        ReedlineEvent::ClearScreen,
    );
    keybindings.add_binding(
        KeyModifiers::NONE,
        KeyCode::Up,
        ReedlineEvent::ExecuteHostCommand(HISTORY_UP.to_string()),
    );
    keybindings.add_binding(
        KeyModifiers::NONE,
        KeyCode::Down,
        ReedlineEvent::ExecuteHostCommand(HISTORY_DOWN.to_string()),
    );
}

fn outcome(signal: Signal) -> ReadOutcome {
    match signal {
        Signal::Success(buffer) if buffer == HISTORY_UP => ReadOutcome::Navigate(Direction::Up),
        Signal::Success(buffer) if buffer == HISTORY_DOWN => {
            ReadOutcome::Navigate(Direction::Down)
        }
        Signal::Success(buffer) => ReadOutcome::Line(buffer),
        Signal::CtrlC | Signal::CtrlD => ReadOutcome::Exit,
    }
}

/// Reads one line, starting with `initial` in the buffer.
///
/// A fresh editor is built for every call and keeps no history of its own;
/// the arrow keys hand navigation back to the caller, so lines captured by a
/// pending prompt are never recallable.
pub fn read_line(
    prompt: &OmegaPrompt,
    initial: &str,
    registry: Arc<CommandRegistry>,
) -> Result<ReadOutcome> {
    let mut normal_keybindings = default_vi_normal_keybindings();
    let mut insert_keybindings = default_vi_insert_keybindings();

    bind_shared_keys(&mut normal_keybindings);
    bind_shared_keys(&mut insert_keybindings);
    insert_keybindings.add_binding(
        KeyModifiers::NONE,
        KeyCode::Tab,
        ReedlineEvent::UntilFound(vec![
            ReedlineEvent::Menu(COMPLETION_MENU.to_string()),
            ReedlineEvent::MenuNext,
        ]),
    );

    let completion_menu = ColumnarMenu::default().with_name(COMPLETION_MENU);
    let mut line_editor = Reedline::create()
        .with_edit_mode(Box::new(Vi::new(insert_keybindings, normal_keybindings)))
        .with_validator(Box::new(OmegaValidator))
        .with_completer(Box::new(OmegaCompleter::new(registry)))
        .with_menu(ReedlineMenu::EngineCompleter(Box::new(completion_menu)));

    if !initial.is_empty() {
        line_editor.run_edit_commands(&[EditCommand::InsertString(initial.to_string())]);
    }

    line_editor
        .read_line(prompt)
        .map(outcome)
        .map_err(|e| anyhow::anyhow!("Error reading input: {}", e))
}
