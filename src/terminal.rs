use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::cmd_parser;
use crate::commands::{self, BuiltinContinuations, CommandRegistry};
use crate::config::OmegaConfig;
use crate::context::{CommandContext, Effect};
use crate::error::CommandError;
use crate::history::{CommandHistory, Direction};
use crate::input_mode::{ContinuationHandler, InputMode, InputModeMachine};
use crate::output::{OutputEvent, OutputKind, OutputLine, Scrollback};
use crate::queue::{CommandQueue, EntryProcessor, QueueEntry};
use crate::services::{OfflineServices, Services};
use crate::session::Session;

/// State owned by the drain loop.
struct DispatchState {
    session: Session,
    input: InputModeMachine,
}

/// Runs dequeued lines: input-mode routing, echo, history, lookup, handler.
struct Dispatcher {
    registry: Arc<CommandRegistry>,
    continuations: Arc<dyn ContinuationHandler>,
    services: Arc<dyn Services>,
    output: Scrollback,
    history: Mutex<CommandHistory>,
    state: tokio::sync::Mutex<DispatchState>,
    quit: AtomicBool,
}

impl Dispatcher {
    fn history(&self) -> MutexGuard<'_, CommandHistory> {
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn context(
        &self,
        command: String,
        args: Vec<String>,
        entry: &QueueEntry,
        session: &Session,
        queue: &CommandQueue,
    ) -> CommandContext {
        CommandContext::new(
            command,
            args,
            entry.line.clone(),
            entry.automated,
            session.clone(),
            self.history().entries(),
            self.services.clone(),
            self.registry.clone(),
            self.output.clone(),
            queue.clone(),
        )
    }

    fn report(&self, err: &CommandError) {
        self.output
            .log(OutputKind::Error, format!("Error: {}", err));
        if let Some(hint) = err.hint() {
            self.output.log(OutputKind::Info, hint);
        }
    }

    fn apply(&self, state: &mut DispatchState, effect: Effect) {
        if let Some(session) = effect.session {
            state.session = session;
        }
        if effect.clear {
            self.output.clear();
        }
        if let Some(mode) = effect.prompt {
            state.input.enter(mode);
        }
        if effect.quit {
            self.quit.store(true, Ordering::SeqCst);
        }
    }
}

/// Awaits a handler future, turning a panic into an error.
async fn guarded<F>(run: F) -> Result<Effect, CommandError>
where
    F: std::future::Future<Output = Result<Effect, CommandError>>,
{
    match AssertUnwindSafe(run).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "handler panicked".to_string());
            Err(CommandError::Other(anyhow::anyhow!(message)))
        }
    }
}

#[async_trait]
impl EntryProcessor for Dispatcher {
    async fn process(&self, entry: QueueEntry, queue: &CommandQueue) {
        let mut state = self.state.lock().await;

        // A pending prompt takes the line before the parser sees it. These
        // lines are not echoed or recorded since they may hold secrets.
        if let Some(continuation) = state.input.route(&entry.line) {
            debug!("Routing input to pending {} prompt", continuation_label(&continuation));
            let ctx = self.context(String::new(), Vec::new(), &entry, &state.session, queue);
            match guarded(self.continuations.resume(&ctx, continuation)).await {
                Ok(effect) => self.apply(&mut state, effect),
                Err(err) => {
                    warn!("Prompt continuation failed: {}", err);
                    self.report(&err);
                }
            }
            return;
        }

        let mut tokens = cmd_parser::tokenize(&entry.line);
        if tokens.is_empty() {
            return;
        }
        let command = tokens.remove(0).to_lowercase();

        self.output
            .push(OutputLine::command(entry.line.clone(), entry.automated));
        self.history().push(&entry.line);
        debug!(automated = entry.automated, "Running command '{}'", command);

        let Some(handler) = self.registry.lookup(&command) else {
            self.output.log(
                OutputKind::Error,
                format!(
                    "Command not found: {}. Type 'help' for available commands.",
                    command
                ),
            );
            return;
        };

        let ctx = self.context(command, tokens, &entry, &state.session, queue);
        match guarded(handler.execute(&ctx)).await {
            Ok(effect) => self.apply(&mut state, effect),
            Err(err) => {
                warn!("Command '{}' failed: {}", ctx.command, err);
                self.report(&err);
            }
        }
    }
}

fn continuation_label(continuation: &crate::input_mode::Continuation) -> &'static str {
    use crate::input_mode::Continuation::*;
    match continuation {
        WalletChoice { .. } => "wallet-choice",
        PrivateKeyImport { .. } => "private-key",
        MixerDirectInput { .. } => "mixer-deposit",
        MixerWithdrawKey { .. } => "mixer-key",
        MixerWithdrawParams { .. } => "mixer-withdraw",
        DmRecipient { .. } => "dm-recipient",
        DmMessage { .. } => "dm-message",
    }
}

/// Builder for [`Terminal`].
pub struct TerminalBuilder {
    config: OmegaConfig,
    registry: CommandRegistry,
    services: Arc<dyn Services>,
    continuations: Arc<dyn ContinuationHandler>,
}

impl TerminalBuilder {
    pub fn registry(mut self, registry: CommandRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn services(mut self, services: Arc<dyn Services>) -> Self {
        self.services = services;
        self
    }

    pub fn continuations(mut self, continuations: Arc<dyn ContinuationHandler>) -> Self {
        self.continuations = continuations;
        self
    }

    /// Starts in normal mode whatever the config says, so the first
    /// automated line is run as a command.
    pub fn without_wallet_prompt(mut self) -> Self {
        self.config.terminal.wallet_prompt_on_start = false;
        self
    }

    pub fn build(self) -> Terminal {
        let output = Scrollback::new(self.config.general.scrollback_limit);
        let mut input = InputModeMachine::new();

        if self.config.terminal.wallet_prompt_on_start {
            output.log(OutputKind::Success, "Welcome to Omega Terminal!");
            commands::wallet::show_wallet_options(&output);
            input.enter(InputMode::AwaitingWalletChoice);
        }
        output.log(OutputKind::Info, "Type 'help' to see available commands");

        let dispatcher = Arc::new(Dispatcher {
            registry: Arc::new(self.registry),
            continuations: self.continuations,
            services: self.services,
            output: output.clone(),
            history: Mutex::new(CommandHistory::new(self.config.general.history_limit)),
            state: tokio::sync::Mutex::new(DispatchState {
                session: Session::new(self.config.terminal.theme, self.config.terminal.sound),
                input,
            }),
            quit: AtomicBool::new(false),
        });

        Terminal {
            queue: CommandQueue::new(dispatcher.clone()),
            dispatcher,
            prompt: self.config.terminal.prompt,
        }
    }
}

/// The command terminal: a queue of submitted lines and the dispatcher that
/// runs them.
pub struct Terminal {
    queue: CommandQueue,
    dispatcher: Arc<Dispatcher>,
    prompt: String,
}

impl Terminal {
    pub fn builder(config: OmegaConfig) -> TerminalBuilder {
        TerminalBuilder {
            config,
            registry: CommandRegistry::with_builtins(),
            services: Arc::new(OfflineServices::new()),
            continuations: Arc::new(BuiltinContinuations),
        }
    }

    pub fn new(config: OmegaConfig) -> Self {
        Self::builder(config).build()
    }

    /// Queues a line typed by the user. Returns `false` for blank input.
    pub fn submit(&self, line: &str) -> bool {
        self.queue.enqueue(line, false)
    }

    /// Queues a line issued on the user's behalf.
    pub fn submit_automated(&self, line: &str) -> bool {
        self.queue.enqueue(line, true)
    }

    /// Waits until every queued line has run.
    pub async fn idle(&self) {
        self.queue.idle().await;
    }

    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<OutputEvent> {
        self.dispatcher.output.subscribe()
    }

    pub fn lines(&self) -> Vec<OutputLine> {
        self.dispatcher.output.lines()
    }

    pub fn history(&self) -> Vec<String> {
        self.dispatcher.history().entries()
    }

    pub fn navigate_history(&self, direction: Direction) -> Option<String> {
        self.dispatcher.history().navigate(direction)
    }

    pub fn registry(&self) -> Arc<CommandRegistry> {
        self.dispatcher.registry.clone()
    }

    pub async fn session(&self) -> Session {
        self.dispatcher.state.lock().await.session.clone()
    }

    pub async fn input_mode(&self) -> InputMode {
        self.dispatcher.state.lock().await.input.mode().clone()
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn should_quit(&self) -> bool {
        self.dispatcher.quit.load(Ordering::SeqCst)
    }
}
