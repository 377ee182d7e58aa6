use async_trait::async_trait;

use super::CommandHandler;
use crate::context::{CommandContext, Effect};
use crate::error::CommandError;
use crate::session::{Theme, WalletState};

pub struct HelpCommand;

#[async_trait]
impl CommandHandler for HelpCommand {
    fn name(&self) -> &str {
        "help"
    }
    fn aliases(&self) -> &[&str] {
        &["?"]
    }
    fn usage(&self) -> &str {
        "help [command]"
    }
    fn description(&self) -> &str {
        "Show available commands"
    }
    async fn execute(&self, ctx: &CommandContext) -> Result<Effect, CommandError> {
        let text = match ctx.arg(0) {
            Some(name) => ctx.registry.get_command_help(name).ok_or_else(|| {
                CommandError::NotFound(format!("No help for unknown command: {}", name))
            })?,
            None => ctx.registry.get_help(),
        };

        for line in text.trim_end().lines() {
            ctx.output(line);
        }
        Ok(Effect::none())
    }
}

pub struct ClearCommand;

#[async_trait]
impl CommandHandler for ClearCommand {
    fn name(&self) -> &str {
        "clear"
    }
    fn aliases(&self) -> &[&str] {
        &["cls"]
    }
    fn usage(&self) -> &str {
        "clear"
    }
    fn description(&self) -> &str {
        "Clear the terminal output"
    }
    async fn execute(&self, _ctx: &CommandContext) -> Result<Effect, CommandError> {
        Ok(Effect::clear())
    }
}

pub struct HistoryCommand;

#[async_trait]
impl CommandHandler for HistoryCommand {
    fn name(&self) -> &str {
        "history"
    }
    fn usage(&self) -> &str {
        "history [--last=<n>]"
    }
    fn description(&self) -> &str {
        "List previously executed commands"
    }
    async fn execute(&self, ctx: &CommandContext) -> Result<Effect, CommandError> {
        let skip = match ctx.parsed_args().flag("last") {
            Some(n) => {
                let n: usize = n.parse().map_err(|_| {
                    CommandError::validation(format!("Invalid --last value '{}'", n))
                })?;
                ctx.history.len().saturating_sub(n)
            }
            None => 0,
        };

        if ctx.history.is_empty() {
            ctx.info("No commands in history.");
        }
        for (i, line) in ctx.history.iter().enumerate().skip(skip) {
            ctx.output(format!("{:>4}  {}", i + 1, line));
        }
        Ok(Effect::none())
    }
}

pub struct ThemeCommand;

#[async_trait]
impl CommandHandler for ThemeCommand {
    fn name(&self) -> &str {
        "theme"
    }
    fn usage(&self) -> &str {
        "theme [name] | theme --list"
    }
    fn description(&self) -> &str {
        "Switch theme, or cycle to the next one"
    }
    fn category(&self) -> &str {
        "Appearance"
    }
    async fn execute(&self, ctx: &CommandContext) -> Result<Effect, CommandError> {
        let args = ctx.parsed_args();
        if args.has_flag("list") {
            for theme in Theme::ALL {
                let marker = if theme == ctx.session.theme { "*" } else { " " };
                ctx.output(format!("{} {}", marker, theme));
            }
            return Ok(Effect::none());
        }

        let theme = match args.positional.first() {
            None => ctx.session.theme.next(),
            Some(name) => name.parse::<Theme>().map_err(|_| {
                let names: Vec<&str> = Theme::ALL.iter().map(|t| t.name()).collect();
                CommandError::validation(format!(
                    "Unknown theme '{}'. Available: {}",
                    name,
                    names.join(", ")
                ))
            })?,
        };

        ctx.success(format!("Theme set to {}", theme));
        Ok(Effect::session(ctx.session.with_theme(theme)))
    }
}

pub struct SoundCommand;

#[async_trait]
impl CommandHandler for SoundCommand {
    fn name(&self) -> &str {
        "sound"
    }
    fn usage(&self) -> &str {
        "sound [on|off]"
    }
    fn description(&self) -> &str {
        "Toggle terminal sound effects"
    }
    fn category(&self) -> &str {
        "Appearance"
    }
    async fn execute(&self, ctx: &CommandContext) -> Result<Effect, CommandError> {
        let enabled = match ctx.arg(0).map(str::to_lowercase).as_deref() {
            None => !ctx.session.sound,
            Some("on") => true,
            Some("off") => false,
            Some(other) => {
                return Err(CommandError::validation(format!(
                    "Usage: sound [on|off] (got '{}')",
                    other
                )))
            }
        };

        ctx.success(format!(
            "Sound effects {}",
            if enabled { "enabled" } else { "disabled" }
        ));
        Ok(Effect::session(ctx.session.with_sound(enabled)))
    }
}

pub struct StatusCommand;

#[async_trait]
impl CommandHandler for StatusCommand {
    fn name(&self) -> &str {
        "status"
    }
    fn usage(&self) -> &str {
        "status"
    }
    fn description(&self) -> &str {
        "Show wallet and terminal status"
    }
    async fn execute(&self, ctx: &CommandContext) -> Result<Effect, CommandError> {
        match &ctx.session.wallet {
            WalletState::Connected { kind, account } => {
                ctx.success(format!("Wallet: {} ({})", account, kind));
            }
            WalletState::Disconnected => ctx.warning("Wallet: not connected"),
        }
        ctx.output(format!("Theme: {}", ctx.session.theme));
        ctx.output(format!(
            "Sound: {}",
            if ctx.session.sound { "on" } else { "off" }
        ));
        ctx.output(format!("Commands run: {}", ctx.history.len()));
        Ok(Effect::none())
    }
}

pub struct EchoCommand;

#[async_trait]
impl CommandHandler for EchoCommand {
    fn name(&self) -> &str {
        "echo"
    }
    fn usage(&self) -> &str {
        "echo <text>"
    }
    fn description(&self) -> &str {
        "Print text to the terminal"
    }
    async fn execute(&self, ctx: &CommandContext) -> Result<Effect, CommandError> {
        ctx.output(ctx.rest(0));
        Ok(Effect::none())
    }
}

pub struct ExitCommand;

#[async_trait]
impl CommandHandler for ExitCommand {
    fn name(&self) -> &str {
        "exit"
    }
    fn aliases(&self) -> &[&str] {
        &["quit"]
    }
    fn usage(&self) -> &str {
        "exit"
    }
    fn description(&self) -> &str {
        "Leave the terminal"
    }
    async fn execute(&self, ctx: &CommandContext) -> Result<Effect, CommandError> {
        ctx.info("Goodbye!");
        Ok(Effect::quit())
    }
}
