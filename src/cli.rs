use std::io::{self, Write};

use anyhow::Result;
use colored::*;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;

use crate::input::{self, OmegaPrompt, ReadOutcome};
use crate::output::{render_line, OutputEvent};
use crate::session::Theme;
use crate::terminal::Terminal;

const HEADER_WIDTH: usize = 60;

fn print_header() {
    println!("{}", "═".repeat(HEADER_WIDTH).bright_blue());
    println!("{}", "OMEGA - Web3 Terminal".bright_white().bold());
    println!("{}", "═".repeat(HEADER_WIDTH).bright_blue());
}

fn print_events(
    events: &mut UnboundedReceiver<OutputEvent>,
    prompt: &str,
    theme: Theme,
) -> Result<()> {
    let mut stdout = io::stdout().lock();
    while let Ok(event) = events.try_recv() {
        match event {
            OutputEvent::Line(line) => {
                writeln!(stdout, "{}", render_line(&line, prompt, theme))?
            }
            OutputEvent::Cleared => {
                write!(stdout, "\x1B[2J\x1B[1;1H")?;
            }
        }
    }
    stdout.flush()?;
    Ok(())
}

/// Runs the interactive terminal until `exit` or Ctrl+C / Ctrl+D.
///
/// `startup` lines are queued as automated commands before the first prompt.
pub async fn run_cli(terminal: Terminal, startup: Vec<String>) -> Result<()> {
    print_header();
    let theme = terminal.session().await.theme;
    for line in terminal.lines() {
        println!("{}", render_line(&line, terminal.prompt(), theme));
    }
    println!("{}", "─".repeat(HEADER_WIDTH).dimmed());

    let mut events = terminal.subscribe();

    if !startup.is_empty() {
        for line in &startup {
            terminal.submit_automated(line);
        }
        terminal.idle().await;
        print_events(&mut events, terminal.prompt(), terminal.session().await.theme)?;
    }

    // buffer text recalled from history for the next read
    let mut recalled = String::new();

    while !terminal.should_quit() {
        let theme = terminal.session().await.theme;
        let prompt = OmegaPrompt::new(terminal.prompt(), terminal.input_mode().await, theme);
        let registry = terminal.registry();

        let outcome =
            tokio::task::block_in_place(|| input::read_line(&prompt, &recalled, registry))?;
        let line = match outcome {
            ReadOutcome::Line(line) => line,
            ReadOutcome::Navigate(direction) => {
                if let Some(entry) = terminal.navigate_history(direction) {
                    recalled = entry;
                }
                continue;
            }
            ReadOutcome::Exit => {
                println!();
                println!("{}", "Goodbye!".bright_white());
                break;
            }
        };
        recalled.clear();

        if !terminal.submit(&line) {
            continue;
        }
        terminal.idle().await;
        // a theme change shows up in the command's own echo
        print_events(&mut events, terminal.prompt(), terminal.session().await.theme)?;
    }

    info!(
        commands = terminal.history().len(),
        drains = terminal.queue().drain_count(),
        "Terminal session ended"
    );
    Ok(())
}
