use async_trait::async_trait;

use super::wallet::normalize_private_key;
use super::CommandHandler;
use crate::context::{CommandContext, Effect};
use crate::error::CommandError;
use crate::input_mode::InputMode;

fn parse_amount(text: &str) -> Result<f64, CommandError> {
    match text.parse::<f64>() {
        Ok(amount) if amount.is_finite() && amount > 0.0 => Ok(amount),
        _ => Err(CommandError::validation(format!(
            "Invalid amount '{}': expected a positive number",
            text
        ))),
    }
}

fn is_address(text: &str) -> bool {
    text.strip_prefix("0x")
        .map(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false)
}

/// `<private_key> <amount>`
pub async fn handle_direct_input(ctx: &CommandContext, input: &str) -> Result<Effect, CommandError> {
    let parts: Vec<&str> = input.split_whitespace().collect();
    let [key, amount] = parts.as_slice() else {
        return Err(CommandError::validation(
            "Expected private key and amount separated by a space",
        ));
    };

    let key = normalize_private_key(key)?;
    let amount = parse_amount(amount)?;

    ctx.info(format!("Depositing {} into the mixer...", amount));
    let note = ctx.services.mixer_deposit(&key, amount).await?;
    ctx.success(format!("Deposit committed: {}", note.commitment));
    ctx.warning("Keep this secret. It is the only way to withdraw:");
    ctx.output(note.secret);
    Ok(Effect::none())
}

/// `<secret> <address>`, after the key was captured on the previous line.
pub async fn handle_withdraw_params(
    ctx: &CommandContext,
    private_key: &str,
    input: &str,
) -> Result<Effect, CommandError> {
    let key = normalize_private_key(private_key)?;
    let parts: Vec<&str> = input.split_whitespace().collect();
    let [secret, address] = parts.as_slice() else {
        return Err(CommandError::validation(
            "Expected secret and withdrawal address separated by a space",
        ));
    };
    if !is_address(address) {
        return Err(CommandError::validation(format!(
            "Invalid withdrawal address '{}'",
            address
        )));
    }

    let tx = ctx.services.mixer_withdraw(&key, secret, address).await?;
    ctx.success(format!("Withdrawal sent to {}: {}", address, tx));
    Ok(Effect::none())
}

pub struct MixerCommand;

#[async_trait]
impl CommandHandler for MixerCommand {
    fn name(&self) -> &str {
        "mixer"
    }
    fn usage(&self) -> &str {
        "mixer <deposit-direct|withdraw-direct|notes>"
    }
    fn description(&self) -> &str {
        "Deposit to or withdraw from the privacy mixer"
    }
    fn category(&self) -> &str {
        "Privacy"
    }
    async fn execute(&self, ctx: &CommandContext) -> Result<Effect, CommandError> {
        match ctx.arg(0).map(str::to_lowercase).as_deref() {
            Some("deposit-direct") => {
                ctx.info("Enter your private key and amount separated by a space:");
                Ok(Effect::prompt(InputMode::AwaitingMixerDirectInput))
            }
            Some("withdraw-direct") => {
                ctx.info("Enter the private key of the withdrawing wallet:");
                Ok(Effect::prompt(InputMode::AwaitingMixerWithdrawKey))
            }
            Some("notes") => {
                let notes = ctx.services.mixer_notes();
                if notes.is_empty() {
                    ctx.info("No deposits this session.");
                }
                for note in notes {
                    ctx.output(format!(
                        "{} {} {}",
                        note.commitment,
                        note.amount,
                        if note.spent { "spent" } else { "unspent" }
                    ));
                }
                Ok(Effect::none())
            }
            _ => Err(CommandError::validation(format!("Usage: {}", self.usage()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1.5").unwrap(), 1.5);
        assert!(parse_amount("0").is_err());
        assert!(parse_amount("-2").is_err());
        assert!(parse_amount("lots").is_err());
        assert!(parse_amount("inf").is_err());
    }

    #[test]
    fn test_is_address() {
        assert!(is_address(&format!("0x{}", "0f".repeat(20))));
        assert!(!is_address("0xabc"));
        assert!(!is_address("vitalik.eth"));
    }
}
