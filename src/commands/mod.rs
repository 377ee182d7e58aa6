use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::{CommandContext, Effect};
use crate::error::CommandError;
use crate::input_mode::{Continuation, ContinuationHandler};

pub mod basic;
pub mod messaging;
pub mod mixer;
pub mod script;
pub mod wallet;

/// A terminal command.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    fn name(&self) -> &str;
    fn aliases(&self) -> &[&str] {
        &[]
    }
    fn usage(&self) -> &str;
    fn description(&self) -> &str;
    fn category(&self) -> &str {
        "General"
    }
    async fn execute(&self, ctx: &CommandContext) -> Result<Effect, CommandError>;
}

/// Result of completing a partial command name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub matches: Vec<String>,
    /// Replacement input when exactly one name matched.
    pub completed: Option<String>,
}

/// Name and alias lookup for all commands.
pub struct CommandRegistry {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
    // primary names in registration order
    names: Vec<String>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            names: Vec::new(),
        }
    }

    /// Registry with every built-in command.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        registry.register(Arc::new(basic::HelpCommand));
        registry.register(Arc::new(basic::ClearCommand));
        registry.register(Arc::new(basic::HistoryCommand));
        registry.register(Arc::new(basic::ThemeCommand));
        registry.register(Arc::new(basic::SoundCommand));
        registry.register(Arc::new(basic::StatusCommand));
        registry.register(Arc::new(basic::EchoCommand));
        registry.register(Arc::new(basic::ExitCommand));
        // Wallet commands
        registry.register(Arc::new(wallet::WalletCommand));
        registry.register(Arc::new(wallet::ConnectCommand));
        registry.register(Arc::new(wallet::CreateCommand));
        registry.register(Arc::new(wallet::ImportCommand));
        registry.register(Arc::new(wallet::DisconnectCommand));
        // Messaging and privacy
        registry.register(Arc::new(messaging::DmCommand));
        registry.register(Arc::new(mixer::MixerCommand));
        // Scripting
        registry.register(Arc::new(script::SourceCommand));

        registry
    }

    /// Maps the handler's name and aliases to it. Earlier mappings for the
    /// same names are overwritten.
    pub fn register(&mut self, handler: Arc<dyn CommandHandler>) {
        let name = handler.name().to_lowercase();
        let keys: Vec<String> = std::iter::once(name.clone())
            .chain(handler.aliases().iter().map(|a| a.to_lowercase()))
            .collect();

        for key in keys {
            self.handlers.insert(key, handler.clone());
        }

        if !self.names.contains(&name) {
            self.names.push(name);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.get(&name.to_lowercase()).cloned()
    }

    /// Primary names (no aliases) whose mapping is still their own handler.
    pub fn list_names(&self) -> Vec<String> {
        self.names
            .iter()
            .filter(|name| {
                self.handlers
                    .get(*name)
                    .map(|h| h.name().eq_ignore_ascii_case(name))
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    pub fn autocomplete(&self, partial: &str) -> Completion {
        let prefix = partial.trim().to_lowercase();
        let matches: Vec<String> = self
            .list_names()
            .into_iter()
            .filter(|name| name.starts_with(&prefix))
            .collect();

        let completed = match matches.as_slice() {
            [only] => Some(format!("{} ", only)),
            _ => None,
        };

        Completion { matches, completed }
    }

    pub fn get_help(&self) -> String {
        let mut help = String::new();
        help.push_str(&format!("{}\n", "─".repeat(60)));
        help.push_str("Omega Terminal Commands\n");
        help.push_str(&format!("{}\n\n", "─".repeat(60)));

        // categories in first-seen order
        let mut categories: Vec<String> = Vec::new();
        let handlers: Vec<Arc<dyn CommandHandler>> = self
            .list_names()
            .iter()
            .filter_map(|name| self.lookup(name))
            .collect();
        for handler in &handlers {
            if !categories.iter().any(|c| c == handler.category()) {
                categories.push(handler.category().to_string());
            }
        }

        for category in categories {
            help.push_str(&format!("{}:\n", category));
            for handler in handlers.iter().filter(|h| h.category() == category) {
                help.push_str(&format!(
                    "  {} - {}\n",
                    handler.usage(),
                    handler.description()
                ));
            }
            help.push('\n');
        }

        help.push_str("Tab completes command names; quote arguments that contain spaces.\n");

        help
    }

    pub fn get_command_help(&self, name: &str) -> Option<String> {
        let handler = self.lookup(name)?;
        let mut help = format!("{}\n", handler.usage());
        help.push_str(&format!("  {}\n", handler.description()));
        if !handler.aliases().is_empty() {
            help.push_str(&format!("  Aliases: {}\n", handler.aliases().join(", ")));
        }
        Some(help)
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Routes captured input to the built-in wallet, DM and mixer flows.
pub struct BuiltinContinuations;

#[async_trait]
impl ContinuationHandler for BuiltinContinuations {
    async fn resume(
        &self,
        ctx: &CommandContext,
        continuation: Continuation,
    ) -> Result<Effect, CommandError> {
        match continuation {
            Continuation::WalletChoice { choice } => wallet::handle_wallet_choice(ctx, &choice).await,
            Continuation::PrivateKeyImport { private_key } => {
                wallet::import_private_key(ctx, &private_key).await
            }
            Continuation::MixerDirectInput { input } => mixer::handle_direct_input(ctx, &input).await,
            Continuation::MixerWithdrawKey { .. } => {
                ctx.info("Now enter your secret and withdrawal address separated by a space:");
                Ok(Effect::none())
            }
            Continuation::MixerWithdrawParams { private_key, input } => {
                mixer::handle_withdraw_params(ctx, &private_key, &input).await
            }
            Continuation::DmRecipient { recipient } => {
                ctx.html(format!(
                    "<span class=\"label\">Recipient:</span> <span>{}</span>",
                    escape_html(&recipient)
                ));
                ctx.info("Enter your message:");
                Ok(Effect::none())
            }
            Continuation::DmMessage { recipient, message } => {
                messaging::send_direct_message(ctx, &recipient, &message).await
            }
        }
    }
}

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#039;")
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str, &'static [&'static str]);

    #[async_trait]
    impl CommandHandler for Named {
        fn name(&self) -> &str {
            self.0
        }
        fn aliases(&self) -> &[&str] {
            self.1
        }
        fn usage(&self) -> &str {
            self.0
        }
        fn description(&self) -> &str {
            "test command"
        }
        async fn execute(&self, _ctx: &CommandContext) -> Result<Effect, CommandError> {
            Ok(Effect::none())
        }
    }

    fn registry(names: &[&'static str]) -> CommandRegistry {
        let mut registry = CommandRegistry::new();
        for name in names {
            registry.register(Arc::new(Named(name, &[])));
        }
        registry
    }

    #[test]
    fn test_lookup_is_case_insensitive_and_resolves_aliases() {
        let mut registry = CommandRegistry::new();
        registry.register(Arc::new(Named("Clear", &["cls"])));

        assert_eq!(registry.lookup("CLEAR").unwrap().name(), "Clear");
        assert_eq!(registry.lookup("Cls").unwrap().name(), "Clear");
        assert!(registry.lookup("reset").is_none());
        assert_eq!(registry.list_names(), vec!["clear".to_string()]);
    }

    #[test]
    fn test_later_registration_overwrites() {
        let mut registry = CommandRegistry::new();
        registry.register(Arc::new(Named("status", &["st"])));
        registry.register(Arc::new(Named("stats", &["st"])));

        assert_eq!(registry.lookup("st").unwrap().name(), "stats");
        assert_eq!(registry.lookup("status").unwrap().name(), "status");

        // a primary name taken over entirely by another command's alias
        registry.register(Arc::new(Named("state", &["status"])));
        assert_eq!(registry.lookup("status").unwrap().name(), "state");
        assert_eq!(
            registry.list_names(),
            vec!["stats".to_string(), "state".to_string()]
        );
    }

    #[test]
    fn test_autocomplete_multiple_matches_leave_input() {
        let registry = registry(&["help", "hack", "hyperliquid"]);
        let completion = registry.autocomplete("h");
        assert_eq!(completion.matches, vec!["help", "hack", "hyperliquid"]);
        assert_eq!(completion.completed, None);
    }

    #[test]
    fn test_autocomplete_single_match_completes() {
        let registry = registry(&["help", "hack", "hyperliquid"]);
        let completion = registry.autocomplete("HE");
        assert_eq!(completion.matches, vec!["help"]);
        assert_eq!(completion.completed.as_deref(), Some("help "));
    }

    #[test]
    fn test_autocomplete_no_match_and_empty_prefix() {
        let registry = registry(&["help", "hack"]);
        let none = registry.autocomplete("zz");
        assert!(none.matches.is_empty());
        assert_eq!(none.completed, None);

        assert_eq!(registry.autocomplete("").matches.len(), 2);
    }

    #[test]
    fn test_autocomplete_skips_aliases() {
        let mut registry = CommandRegistry::new();
        registry.register(Arc::new(Named("create", &["yes"])));
        assert!(registry.autocomplete("y").matches.is_empty());
    }

    #[test]
    fn test_builtins_help_lists_categories() {
        let registry = CommandRegistry::with_builtins();
        let help = registry.get_help();
        assert!(help.contains("\nWallet:\n"));
        assert!(help.contains("  dm [recipient] [message...] | dm --sent - "));
        // plain text; styling happens when lines are rendered
        assert!(!help.contains('\u{1b}'));
        assert!(registry.get_command_help("quit").unwrap().contains("exit"));
        assert!(registry.get_command_help("nope").is_none());
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>\"x\" & 'y'</b>"), "&lt;b&gt;&quot;x&quot; &amp; &#039;y&#039;&lt;/b&gt;");
    }
}
