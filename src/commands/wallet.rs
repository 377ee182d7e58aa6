use async_trait::async_trait;
use tracing::info;

use super::CommandHandler;
use crate::context::{CommandContext, Effect};
use crate::error::CommandError;
use crate::input_mode::InputMode;
use crate::output::{OutputKind, Scrollback};
use crate::session::WalletKind;

const WALLET_OPTIONS: &str = r#"<div class="wallet-options">
  <div><b>connect</b> - Connect your browser wallet</div>
  <div><b>yes</b> - Create a new session wallet</div>
  <div><b>import</b> - Import an existing wallet with its private key</div>
</div>"#;

/// Prints the wallet menu. The caller decides whether to await a choice.
pub fn show_wallet_options(output: &Scrollback) {
    output.log(OutputKind::Info, "Choose your wallet option:");
    output.log(OutputKind::Html, WALLET_OPTIONS);
}

/// Accepts 64 hex digits with or without a `0x` prefix and returns them
/// lowercased without the prefix.
pub fn normalize_private_key(input: &str) -> Result<String, CommandError> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.len() != 64 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(CommandError::validation(
            "Invalid private key: expected 64 hex characters",
        ));
    }
    Ok(digits.to_lowercase())
}

pub async fn handle_wallet_choice(ctx: &CommandContext, choice: &str) -> Result<Effect, CommandError> {
    match choice {
        "connect" => connect_browser(ctx).await,
        "yes" | "create" => create_session(ctx).await,
        "import" => {
            ctx.info("Enter your private key:");
            Ok(Effect::prompt(InputMode::AwaitingPrivateKeyImport))
        }
        other => Err(CommandError::validation(format!(
            "Invalid wallet choice '{}'. Type 'wallet' to see the options again.",
            other
        ))),
    }
}

pub async fn import_private_key(ctx: &CommandContext, input: &str) -> Result<Effect, CommandError> {
    let key = normalize_private_key(input)?;
    let wallet = ctx.services.import_private_key(&key).await?;
    info!("Imported wallet {}", wallet.account);
    ctx.success(format!("Wallet imported: {}", wallet.account));
    Ok(Effect::session(
        ctx.session.with_wallet(WalletKind::Imported, wallet.account),
    ))
}

async fn connect_browser(ctx: &CommandContext) -> Result<Effect, CommandError> {
    ctx.info("Connecting to browser wallet...");
    let wallet = ctx.services.connect_browser_wallet().await?;
    ctx.success(format!("Connected: {}", wallet.account));
    Ok(Effect::session(
        ctx.session.with_wallet(WalletKind::Browser, wallet.account),
    ))
}

async fn create_session(ctx: &CommandContext) -> Result<Effect, CommandError> {
    let wallet = ctx.services.create_session_wallet().await?;
    ctx.success(format!("Session wallet created: {}", wallet.account));
    ctx.warning("Save this private key now. It will not be shown again:");
    ctx.output(format!("0x{}", wallet.private_key));
    Ok(Effect::session(
        ctx.session.with_wallet(WalletKind::Session, wallet.account),
    ))
}

pub struct WalletCommand;

#[async_trait]
impl CommandHandler for WalletCommand {
    fn name(&self) -> &str {
        "wallet"
    }
    fn usage(&self) -> &str {
        "wallet"
    }
    fn description(&self) -> &str {
        "Show wallet options and pick one"
    }
    fn category(&self) -> &str {
        "Wallet"
    }
    async fn execute(&self, ctx: &CommandContext) -> Result<Effect, CommandError> {
        if let Some(account) = ctx.session.wallet.account() {
            ctx.info(format!("Currently connected: {}", account));
        }
        show_wallet_options(ctx.scrollback());
        Ok(Effect::prompt(InputMode::AwaitingWalletChoice))
    }
}

pub struct ConnectCommand;

#[async_trait]
impl CommandHandler for ConnectCommand {
    fn name(&self) -> &str {
        "connect"
    }
    fn usage(&self) -> &str {
        "connect"
    }
    fn description(&self) -> &str {
        "Connect a browser wallet"
    }
    fn category(&self) -> &str {
        "Wallet"
    }
    async fn execute(&self, ctx: &CommandContext) -> Result<Effect, CommandError> {
        connect_browser(ctx).await
    }
}

pub struct CreateCommand;

#[async_trait]
impl CommandHandler for CreateCommand {
    fn name(&self) -> &str {
        "create"
    }
    fn aliases(&self) -> &[&str] {
        &["yes"]
    }
    fn usage(&self) -> &str {
        "create"
    }
    fn description(&self) -> &str {
        "Create a new session wallet"
    }
    fn category(&self) -> &str {
        "Wallet"
    }
    async fn execute(&self, ctx: &CommandContext) -> Result<Effect, CommandError> {
        create_session(ctx).await
    }
}

pub struct ImportCommand;

#[async_trait]
impl CommandHandler for ImportCommand {
    fn name(&self) -> &str {
        "import"
    }
    fn usage(&self) -> &str {
        "import [private_key]"
    }
    fn description(&self) -> &str {
        "Import a wallet from its private key"
    }
    fn category(&self) -> &str {
        "Wallet"
    }
    async fn execute(&self, ctx: &CommandContext) -> Result<Effect, CommandError> {
        match ctx.arg(0) {
            Some(key) => import_private_key(ctx, key).await,
            None => {
                ctx.info("Enter your private key:");
                Ok(Effect::prompt(InputMode::AwaitingPrivateKeyImport))
            }
        }
    }
}

pub struct DisconnectCommand;

#[async_trait]
impl CommandHandler for DisconnectCommand {
    fn name(&self) -> &str {
        "disconnect"
    }
    fn usage(&self) -> &str {
        "disconnect"
    }
    fn description(&self) -> &str {
        "Forget the connected wallet"
    }
    fn category(&self) -> &str {
        "Wallet"
    }
    async fn execute(&self, ctx: &CommandContext) -> Result<Effect, CommandError> {
        if !ctx.session.wallet.is_connected() {
            ctx.warning("No wallet connected.");
            return Ok(Effect::none());
        }
        ctx.success("Wallet disconnected.");
        Ok(Effect::session(ctx.session.disconnected()))
    }
}
