use async_trait::async_trait;
use tracing::debug;

use super::CommandHandler;
use crate::cmd_parser;
use crate::context::{CommandContext, Effect};
use crate::error::CommandError;

/// Commands in a script file: its fenced command blocks when it has any,
/// otherwise every non-comment line.
pub fn script_commands(text: &str) -> Vec<String> {
    cmd_parser::parse_command_blocks(text).unwrap_or_else(|| cmd_parser::parse_script_lines(text))
}

pub struct SourceCommand;

#[async_trait]
impl CommandHandler for SourceCommand {
    fn name(&self) -> &str {
        "source"
    }
    fn usage(&self) -> &str {
        "source <path>"
    }
    fn description(&self) -> &str {
        "Queue every command in a script file"
    }
    fn category(&self) -> &str {
        "Scripting"
    }
    async fn execute(&self, ctx: &CommandContext) -> Result<Effect, CommandError> {
        let path = ctx
            .arg(0)
            .ok_or_else(|| CommandError::validation("Usage: source <path>"))?;

        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CommandError::io(path, e))?;
        let commands = script_commands(&text);
        if commands.is_empty() {
            ctx.warning(format!("No commands found in {}", path));
            return Ok(Effect::none());
        }

        for command in &commands {
            debug!("Queueing scripted command: {}", command);
            ctx.execute(command);
        }
        ctx.info(format!("Queued {} command(s) from {}", commands.len(), path));
        Ok(Effect::none())
    }
}
