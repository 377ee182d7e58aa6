use async_trait::async_trait;
use tracing::info;

use super::{escape_html, CommandHandler};
use crate::context::{CommandContext, Effect};
use crate::error::CommandError;
use crate::input_mode::InputMode;

/// `0x` followed by 40 hex digits, or an ENS-style `name.eth`.
pub fn is_valid_recipient(recipient: &str) -> bool {
    if let Some(hex) = recipient.strip_prefix("0x") {
        return hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit());
    }
    match recipient.strip_suffix(".eth") {
        Some(label) => {
            !label.is_empty()
                && label
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
        }
        None => false,
    }
}

pub async fn send_direct_message(
    ctx: &CommandContext,
    recipient: &str,
    message: &str,
) -> Result<Effect, CommandError> {
    let recipient = recipient.trim();
    let message = message.trim();
    if recipient.is_empty() || message.is_empty() {
        return Err(CommandError::validation("Recipient and message required."));
    }
    if !is_valid_recipient(recipient) {
        return Err(CommandError::validation(format!(
            "Invalid recipient '{}': expected a 0x address or .eth name",
            recipient
        )));
    }
    let sender = ctx
        .session
        .wallet
        .account()
        .ok_or_else(|| CommandError::not_initialized("Please connect your wallet first"))?;

    ctx.html(format!(
        "<span class=\"label\">Message:</span> <span>{}</span>",
        escape_html(message)
    ));
    let id = ctx
        .services
        .send_direct_message(sender, recipient, message)
        .await?;
    info!("Direct message {} sent to {}", id, recipient);
    ctx.success(format!("Message sent to {}", recipient));
    Ok(Effect::none())
}

pub struct DmCommand;

#[async_trait]
impl CommandHandler for DmCommand {
    fn name(&self) -> &str {
        "dm"
    }
    fn aliases(&self) -> &[&str] {
        &["email"]
    }
    fn usage(&self) -> &str {
        "dm [recipient] [message...] | dm --sent"
    }
    fn description(&self) -> &str {
        "Send a direct message to an address"
    }
    fn category(&self) -> &str {
        "Messaging"
    }
    async fn execute(&self, ctx: &CommandContext) -> Result<Effect, CommandError> {
        if ctx.parsed_args().has_flag("sent") {
            let sent = ctx.services.sent_messages();
            if sent.is_empty() {
                ctx.info("No messages sent this session.");
            }
            for message in sent {
                ctx.output(format!(
                    "{} {} -> {}: {}",
                    message.sent_at.format("%Y-%m-%d %H:%M"),
                    message.from,
                    message.to,
                    message.body
                ));
            }
            return Ok(Effect::none());
        }

        if !ctx.session.wallet.is_connected() {
            return Err(CommandError::not_initialized(
                "Please connect your wallet first",
            ));
        }

        match (ctx.arg(0), ctx.args.len()) {
            (None, _) => {
                ctx.info("Enter recipient address or ENS name:");
                Ok(Effect::prompt(InputMode::AwaitingDmRecipient))
            }
            (Some(recipient), 1) => {
                ctx.info("Enter your message:");
                Ok(Effect::prompt(InputMode::AwaitingDmMessage {
                    recipient: recipient.to_string(),
                }))
            }
            (Some(recipient), _) => send_direct_message(ctx, recipient, &ctx.rest(1)).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipient_validation() {
        assert!(is_valid_recipient(&format!("0x{}", "a1".repeat(20))));
        assert!(is_valid_recipient("vitalik.eth"));
        assert!(is_valid_recipient("pay.my-dao.eth"));
        assert!(!is_valid_recipient("0x1234"));
        assert!(!is_valid_recipient(".eth"));
        assert!(!is_valid_recipient("vitalik"));
        assert!(!is_valid_recipient("not an address"));
    }
}
