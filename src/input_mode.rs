use std::fmt;

use async_trait::async_trait;
use tracing::warn;

use crate::context::{CommandContext, Effect};
use crate::error::CommandError;

/// What the terminal expects the next line to be.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    AwaitingWalletChoice,
    AwaitingPrivateKeyImport,
    /// `<private_key> <amount>` for a direct mixer deposit.
    AwaitingMixerDirectInput,
    AwaitingMixerWithdrawKey,
    /// `<secret> <address>`, with the key captured on the previous line.
    AwaitingMixerWithdrawParams { private_key: String },
    AwaitingDmRecipient,
    AwaitingDmMessage { recipient: String },
}

impl InputMode {
    pub fn is_normal(&self) -> bool {
        matches!(self, InputMode::Normal)
    }

    /// Short label for prompts and logs. Never includes scratch data.
    pub fn label(&self) -> &'static str {
        match self {
            InputMode::Normal => "normal",
            InputMode::AwaitingWalletChoice => "wallet-choice",
            InputMode::AwaitingPrivateKeyImport => "private-key",
            InputMode::AwaitingMixerDirectInput => "mixer-deposit",
            InputMode::AwaitingMixerWithdrawKey => "mixer-key",
            InputMode::AwaitingMixerWithdrawParams { .. } => "mixer-withdraw",
            InputMode::AwaitingDmRecipient => "dm-recipient",
            InputMode::AwaitingDmMessage { .. } => "dm-message",
        }
    }
}

impl fmt::Display for InputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A line captured by a pending mode, plus the scratch state collected so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Continuation {
    WalletChoice { choice: String },
    PrivateKeyImport { private_key: String },
    MixerDirectInput { input: String },
    MixerWithdrawKey { private_key: String },
    MixerWithdrawParams { private_key: String, input: String },
    DmRecipient { recipient: String },
    DmMessage { recipient: String, message: String },
}

/// Single-slot holder of the pending input mode.
#[derive(Debug, Default)]
pub struct InputModeMachine {
    mode: InputMode,
}

impl InputModeMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> &InputMode {
        &self.mode
    }

    /// Makes `mode` the pending mode. A different pending mode is dropped.
    pub fn enter(&mut self, mode: InputMode) {
        if !self.mode.is_normal() && self.mode != mode {
            warn!(
                "Replacing pending input mode '{}' with '{}'",
                self.mode, mode
            );
        }
        self.mode = mode;
    }

    /// Consumes `line` if a mode is pending.
    ///
    /// The pending mode is always cleared, whether or not the line is usable.
    /// A DM recipient moves on to awaiting the message, and a mixer withdraw
    /// key moves on to awaiting the withdraw parameters.
    pub fn route(&mut self, line: &str) -> Option<Continuation> {
        let text = line.trim().to_string();

        let (continuation, next) = match std::mem::take(&mut self.mode) {
            InputMode::Normal => return None,
            InputMode::AwaitingWalletChoice => (
                Continuation::WalletChoice {
                    choice: text.to_lowercase(),
                },
                InputMode::Normal,
            ),
            InputMode::AwaitingPrivateKeyImport => (
                Continuation::PrivateKeyImport { private_key: text },
                InputMode::Normal,
            ),
            InputMode::AwaitingMixerDirectInput => (
                Continuation::MixerDirectInput { input: text },
                InputMode::Normal,
            ),
            InputMode::AwaitingMixerWithdrawKey => (
                Continuation::MixerWithdrawKey {
                    private_key: text.clone(),
                },
                InputMode::AwaitingMixerWithdrawParams { private_key: text },
            ),
            InputMode::AwaitingMixerWithdrawParams { private_key } => (
                Continuation::MixerWithdrawParams {
                    private_key,
                    input: text,
                },
                InputMode::Normal,
            ),
            InputMode::AwaitingDmRecipient => (
                Continuation::DmRecipient {
                    recipient: text.clone(),
                },
                InputMode::AwaitingDmMessage { recipient: text },
            ),
            InputMode::AwaitingDmMessage { recipient } => (
                Continuation::DmMessage {
                    recipient,
                    message: text,
                },
                InputMode::Normal,
            ),
        };

        self.mode = next;
        Some(continuation)
    }
}

/// Receives lines captured by a pending input mode.
///
/// Implementations validate the input and report problems themselves; the
/// state machine never re-prompts.
#[async_trait]
pub trait ContinuationHandler: Send + Sync {
    async fn resume(
        &self,
        ctx: &CommandContext,
        continuation: Continuation,
    ) -> Result<Effect, CommandError>;
}
