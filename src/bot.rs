//! Bot builder and dispatch loop.
//!
//! The [`BotBuilder`] provides a fluent API for registering handlers and
//! starting the runtime. The [`Bot`] manages the lifecycle:
//! 1. Seal the registry into a [`Router`]
//! 2. Receive interactions from the transport
//! 3. Dispatch each one on its own task, bounded by a semaphore
//! 4. Stop when the incoming channel closes or a stop is requested, then
//!    wait for every in-flight handler
//!
//! # Example
//!
//! ```ignore
//! use cc_finder::Bot;
//!
//! let bot = Bot::builder()
//!     .registry(cc_finder::commands::registry(store, &config.wiki))
//!     .max_concurrent_handlers(256)
//!     .start(incoming, sink)?;
//!
//! bot.shutdown(Duration::from_secs(10)).await?;
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Notify, Semaphore};
use tokio::task::{JoinError, JoinHandle, JoinSet};

use crate::config::DEFAULT_MAX_CONCURRENT_HANDLERS;
use crate::error::{FinderError, Result};
use crate::interaction::{AutocompleteEvent, CommandEvent, Interaction, ResponseContext};
use crate::router::{CommandRegistry, HandlerResult, Route, Router};
use crate::writer::ResponseSink;

/// Builder for configuring and starting a [`Bot`].
pub struct BotBuilder {
    registry: CommandRegistry,
    max_concurrent_handlers: usize,
}

impl BotBuilder {
    /// Create a new bot builder.
    pub fn new() -> Self {
        Self {
            registry: CommandRegistry::new(),
            max_concurrent_handlers: DEFAULT_MAX_CONCURRENT_HANDLERS,
        }
    }

    /// Replace the registry with a prepared one.
    pub fn registry(mut self, registry: CommandRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Register a command handler.
    pub fn command<F, Fut>(mut self, path: &str, handler: F) -> Self
    where
        F: Fn(CommandEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.registry.command(path, handler);
        self
    }

    /// Register an autocomplete handler.
    pub fn autocomplete<F, Fut>(mut self, path: &str, handler: F) -> Self
    where
        F: Fn(AutocompleteEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.registry.autocomplete(path, handler);
        self
    }

    /// Register handlers under a common prefix.
    pub fn route<F>(mut self, prefix: &str, f: F) -> Self
    where
        F: FnOnce(&mut Route<'_>),
    {
        self.registry.route(prefix, f);
        self
    }

    /// Set the maximum number of concurrent handlers.
    ///
    /// When this limit is reached, the dispatch loop waits for a running
    /// handler to finish before taking the next interaction.
    /// Default: 256
    pub fn max_concurrent_handlers(mut self, limit: usize) -> Self {
        self.max_concurrent_handlers = limit;
        self
    }

    /// Seal the registry and start dispatching.
    ///
    /// Fails if the registry does not seal (duplicate paths). Must be called
    /// inside a Tokio runtime.
    pub fn start(
        self,
        incoming: mpsc::Receiver<Interaction>,
        sink: ResponseSink,
    ) -> Result<Bot> {
        if self.max_concurrent_handlers == 0 {
            return Err(FinderError::Config(
                "max_concurrent_handlers must be greater than zero".to_string(),
            ));
        }
        let router = Arc::new(self.registry.seal()?);
        tracing::info!(paths = ?router.paths(), "Command router sealed");
        Ok(Bot::start(router, incoming, sink, self.max_concurrent_handlers))
    }
}

impl Default for BotBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running bot.
///
/// Use `wait_for_shutdown()` to block until the transport closes, or
/// `shutdown()` to stop taking interactions and drain with a deadline.
pub struct Bot {
    router: Arc<Router>,
    stop: Arc<Notify>,
    dispatch_task: JoinHandle<()>,
}

impl Bot {
    /// Create a new bot builder.
    pub fn builder() -> BotBuilder {
        BotBuilder::new()
    }

    fn start(
        router: Arc<Router>,
        incoming: mpsc::Receiver<Interaction>,
        sink: ResponseSink,
        max_concurrent_handlers: usize,
    ) -> Self {
        let semaphore = Arc::new(Semaphore::new(max_concurrent_handlers));
        let stop = Arc::new(Notify::new());

        let dispatch_task = tokio::spawn(Self::dispatch_loop(
            incoming,
            router.clone(),
            sink,
            semaphore,
            stop.clone(),
        ));

        Bot {
            router,
            stop,
            dispatch_task,
        }
    }

    /// Main loop - receives interactions and spawns a handler task for each.
    ///
    /// Once the incoming channel closes or a stop is requested, waits for
    /// every handler it spawned before returning.
    async fn dispatch_loop(
        mut incoming: mpsc::Receiver<Interaction>,
        router: Arc<Router>,
        sink: ResponseSink,
        semaphore: Arc<Semaphore>,
        stop: Arc<Notify>,
    ) {
        let mut handlers = JoinSet::new();

        loop {
            let interaction = tokio::select! {
                biased;
                _ = stop.notified() => {
                    tracing::debug!("Stop requested, dispatch loop finishing");
                    break;
                }
                Some(joined) = handlers.join_next(), if !handlers.is_empty() => {
                    log_join(joined);
                    continue;
                }
                next = incoming.recv() => match next {
                    Some(interaction) => interaction,
                    None => {
                        tracing::debug!("Incoming channel closed, dispatch loop finishing");
                        break;
                    }
                },
            };

            // Permit is held until the handler task completes
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(p) => p,
                Err(_) => break,
            };

            let router = router.clone();
            let ctx = ResponseContext::with_sink(interaction.id(), sink.clone());

            handlers.spawn(async move {
                let _permit = permit;
                let id = interaction.id().to_string();
                let path = interaction.path().to_string();

                if let Err(e) = router.dispatch(interaction, ctx).await {
                    match &e {
                        FinderError::CommandNotFound(_) | FinderError::AutocompleteNotFound(_) => {
                            tracing::warn!(%id, %path, "Unroutable interaction: {}", e)
                        }
                        _ => tracing::error!(%id, %path, "Handler error: {}", e),
                    }
                }
            });
        }

        drop(sink);
        if !handlers.is_empty() {
            tracing::debug!(pending = handlers.len(), "Waiting for in-flight handlers");
        }
        while let Some(joined) = handlers.join_next().await {
            log_join(joined);
        }
    }

    /// The sealed router.
    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Stop taking interactions. Handlers already running finish on their
    /// own.
    pub fn stop(&self) {
        self.stop.notify_one();
    }

    /// Wait until the dispatch loop ends and every handler it started has
    /// finished.
    ///
    /// Cancel-safe: dropping this future leaves the bot running.
    pub async fn wait_for_shutdown(&mut self) -> Result<()> {
        match (&mut self.dispatch_task).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => Err(FinderError::TaskFailed(e.to_string())),
        }
    }

    /// Stop taking interactions and wait up to `grace` for running handlers.
    ///
    /// Handlers still running after `grace` are aborted and their replies
    /// are lost.
    pub async fn shutdown(mut self, grace: Duration) -> Result<()> {
        self.stop();
        if let Ok(result) = tokio::time::timeout(grace, self.wait_for_shutdown()).await {
            return result;
        }

        tracing::warn!("Handlers still running after {:?}, aborting", grace);
        self.dispatch_task.abort();
        self.wait_for_shutdown().await
    }
}

fn log_join(joined: std::result::Result<(), JoinError>) {
    if let Err(e) = joined {
        if e.is_panic() {
            tracing::error!("Handler task panicked: {}", e);
        }
    }
}
