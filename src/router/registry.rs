//! Command registry and sealed router.
//!
//! Registration happens once at startup on a [`CommandRegistry`]. Calling
//! [`CommandRegistry::seal`] validates it and produces a [`Router`], which
//! is immutable and shared across every in-flight interaction.
//!
//! Registering the same path twice is not rejected on the spot; it is
//! recorded and reported by `seal`, so all conflicts surface together at
//! startup.

use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;

use futures::future::BoxFuture;

use crate::error::{FinderError, Result};
use crate::interaction::{AutocompleteEvent, CommandEvent, Interaction, ResponseContext};

/// Result type for handler functions.
pub type HandlerResult = Result<()>;

/// Trait for command handlers.
pub trait CommandHandler: Send + Sync + 'static {
    fn call(&self, event: CommandEvent) -> BoxFuture<'static, HandlerResult>;
}

/// Trait for autocomplete handlers.
pub trait AutocompleteHandler: Send + Sync + 'static {
    fn call(&self, event: AutocompleteEvent) -> BoxFuture<'static, HandlerResult>;
}

/// Adapts an async closure into a [`CommandHandler`].
pub struct FnCommandHandler<F, Fut> {
    handler: F,
    _phantom: PhantomData<fn() -> Fut>,
}

impl<F, Fut> FnCommandHandler<F, Fut>
where
    F: Fn(CommandEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }
}

impl<F, Fut> CommandHandler for FnCommandHandler<F, Fut>
where
    F: Fn(CommandEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, event: CommandEvent) -> BoxFuture<'static, HandlerResult> {
        Box::pin((self.handler)(event))
    }
}

/// Adapts an async closure into an [`AutocompleteHandler`].
pub struct FnAutocompleteHandler<F, Fut> {
    handler: F,
    _phantom: PhantomData<fn() -> Fut>,
}

impl<F, Fut> FnAutocompleteHandler<F, Fut>
where
    F: Fn(AutocompleteEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }
}

impl<F, Fut> AutocompleteHandler for FnAutocompleteHandler<F, Fut>
where
    F: Fn(AutocompleteEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, event: AutocompleteEvent) -> BoxFuture<'static, HandlerResult> {
        Box::pin((self.handler)(event))
    }
}

/// Normalize a command path: leading `/`, no empty or trailing segments.
///
/// `"wiki/"` and `"/wiki"` both become `"/wiki"`; `""` becomes `"/"`.
pub fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.trim().is_empty()).collect();
    format!("/{}", segments.join("/"))
}

/// Join a route prefix and a sub-path: `"/wiki"` + `"/"` is `"/wiki"`.
pub fn join_path(prefix: &str, path: &str) -> String {
    normalize_path(&format!("{}/{}", prefix, path))
}

/// Handlers registered for one path while registering.
#[derive(Default)]
struct PendingRoute {
    command: Option<Box<dyn CommandHandler>>,
    autocomplete: Option<Box<dyn AutocompleteHandler>>,
}

/// Registry collecting handlers before the router is sealed.
#[derive(Default)]
pub struct CommandRegistry {
    routes: HashMap<String, PendingRoute>,
    /// Paths registered more than once.
    duplicates: Vec<String>,
}

impl CommandRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command handler closure at `path`.
    pub fn command<F, Fut>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(CommandEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.command_handler(path, FnCommandHandler::new(handler))
    }

    /// Register an autocomplete handler closure at `path`.
    pub fn autocomplete<F, Fut>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(AutocompleteEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.autocomplete_handler(path, FnAutocompleteHandler::new(handler))
    }

    /// Register a [`CommandHandler`] at `path`.
    pub fn command_handler<H: CommandHandler>(&mut self, path: &str, handler: H) -> &mut Self {
        let path = normalize_path(path);
        let entry = self.routes.entry(path.clone()).or_default();
        if entry.command.is_some() {
            self.duplicates.push(format!("{} (command)", path));
        } else {
            entry.command = Some(Box::new(handler));
        }
        self
    }

    /// Register an [`AutocompleteHandler`] at `path`.
    pub fn autocomplete_handler<H: AutocompleteHandler>(
        &mut self,
        path: &str,
        handler: H,
    ) -> &mut Self {
        let path = normalize_path(path);
        let entry = self.routes.entry(path.clone()).or_default();
        if entry.autocomplete.is_some() {
            self.duplicates.push(format!("{} (autocomplete)", path));
        } else {
            entry.autocomplete = Some(Box::new(handler));
        }
        self
    }

    /// Register handlers under a common prefix.
    pub fn route<F>(&mut self, prefix: &str, f: F) -> &mut Self
    where
        F: FnOnce(&mut Route<'_>),
    {
        let mut route = Route {
            registry: &mut *self,
            prefix: normalize_path(prefix),
        };
        f(&mut route);
        self
    }

    /// Registered paths, sorted.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }

    /// Validate and freeze the registry.
    ///
    /// Fails on the first duplicate registration, or if an autocomplete
    /// handler has no command handler on the same path.
    pub fn seal(self) -> Result<Router> {
        if let Some(dup) = self.duplicates.into_iter().next() {
            return Err(FinderError::DuplicateRoute(dup));
        }

        let mut routes = HashMap::with_capacity(self.routes.len());
        for (path, pending) in self.routes {
            let command = pending.command.ok_or_else(|| {
                FinderError::Config(format!(
                    "autocomplete handler at {} has no command handler",
                    path
                ))
            })?;
            routes.insert(
                path,
                SealedRoute {
                    command,
                    autocomplete: pending.autocomplete,
                },
            );
        }

        Ok(Router { routes })
    }
}

/// Registration scope under a path prefix, see [`CommandRegistry::route`].
pub struct Route<'a> {
    registry: &'a mut CommandRegistry,
    prefix: String,
}

impl Route<'_> {
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn command<F, Fut>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(CommandEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let path = join_path(&self.prefix, path);
        self.registry.command(&path, handler);
        self
    }

    pub fn autocomplete<F, Fut>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(AutocompleteEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let path = join_path(&self.prefix, path);
        self.registry.autocomplete(&path, handler);
        self
    }

    /// Nested prefix.
    pub fn route<F>(&mut self, prefix: &str, f: F) -> &mut Self
    where
        F: FnOnce(&mut Route<'_>),
    {
        let mut nested = Route {
            prefix: join_path(&self.prefix, prefix),
            registry: &mut *self.registry,
        };
        f(&mut nested);
        self
    }
}

/// Sealed handlers for one path.
struct SealedRoute {
    command: Box<dyn CommandHandler>,
    autocomplete: Option<Box<dyn AutocompleteHandler>>,
}

/// Immutable path → handler mapping.
///
/// `Router` is `Send + Sync` and is shared as `Arc<Router>` without locks.
pub struct Router {
    routes: HashMap<String, SealedRoute>,
}

impl Router {
    pub fn contains(&self, path: &str) -> bool {
        self.routes.contains_key(&normalize_path(path))
    }

    pub fn has_autocomplete(&self, path: &str) -> bool {
        self.routes
            .get(&normalize_path(path))
            .is_some_and(|route| route.autocomplete.is_some())
    }

    /// Sealed paths, sorted.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }

    /// Dispatch an interaction to its handler.
    ///
    /// # Errors
    ///
    /// `CommandNotFound` / `AutocompleteNotFound` when nothing is registered
    /// for the path; otherwise whatever the handler returns.
    pub async fn dispatch(&self, interaction: Interaction, ctx: ResponseContext) -> HandlerResult {
        match interaction {
            Interaction::Command(data) => {
                let route = self
                    .routes
                    .get(&normalize_path(&data.path))
                    .ok_or_else(|| FinderError::CommandNotFound(data.path.clone()))?;
                route.command.call(CommandEvent::new(data, ctx)).await
            }
            Interaction::Autocomplete(data) => {
                let handler = self
                    .routes
                    .get(&normalize_path(&data.path))
                    .and_then(|route| route.autocomplete.as_ref())
                    .ok_or_else(|| FinderError::AutocompleteNotFound(data.path.clone()))?;
                handler.call(AutocompleteEvent::new(data, ctx)).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::MessageCreate;
    use crate::interaction::{CommandData, InteractionResponse, OptionBag};
    use crate::writer::ResponseSink;

    fn command(path: &str) -> Interaction {
        Interaction::Command(CommandData::new("1", path, OptionBag::new()))
    }

    fn autocomplete(path: &str) -> Interaction {
        Interaction::Autocomplete(CommandData::new("1", path, OptionBag::new()))
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/wiki"), "/wiki");
        assert_eq!(normalize_path("wiki/"), "/wiki");
        assert_eq!(normalize_path("//wiki//card/"), "/wiki/card");
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("/"), "/");
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("/wiki", "/"), "/wiki");
        assert_eq!(join_path("/wiki", "/card"), "/wiki/card");
        assert_eq!(join_path("/", "/ping"), "/ping");
    }

    #[test]
    fn test_nested_route_registration() {
        let mut registry = CommandRegistry::new();
        registry.command("/ping", |_| async { Ok(()) });
        registry.route("/wiki", |r| {
            r.autocomplete("/", |_| async { Ok(()) });
            r.command("/", |_| async { Ok(()) });
            r.route("/admin", |r| {
                r.command("/reload", |_| async { Ok(()) });
            });
        });

        assert_eq!(registry.paths(), vec!["/ping", "/wiki", "/wiki/admin/reload"]);

        let router = registry.seal().unwrap();
        assert!(router.contains("/wiki"));
        assert!(router.has_autocomplete("/wiki"));
        assert!(!router.has_autocomplete("/ping"));
    }

    #[test]
    fn test_duplicate_command_rejected_at_seal() {
        let mut registry = CommandRegistry::new();
        registry.command("/wiki", |_| async { Ok(()) });
        registry.route("/wiki", |r| {
            r.command("/", |_| async { Ok(()) });
        });

        let err = registry.seal().err().unwrap();
        assert!(matches!(err, FinderError::DuplicateRoute(p) if p == "/wiki (command)"));
    }

    #[test]
    fn test_duplicate_autocomplete_rejected_at_seal() {
        let mut registry = CommandRegistry::new();
        registry
            .command("/wiki", |_| async { Ok(()) })
            .autocomplete("/wiki", |_| async { Ok(()) })
            .autocomplete("wiki/", |_| async { Ok(()) });

        assert!(matches!(
            registry.seal(),
            Err(FinderError::DuplicateRoute(_))
        ));
    }

    #[test]
    fn test_orphan_autocomplete_rejected_at_seal() {
        let mut registry = CommandRegistry::new();
        registry.autocomplete("/wiki", |_| async { Ok(()) });

        assert!(matches!(registry.seal(), Err(FinderError::Config(_))));
    }

    #[tokio::test]
    async fn test_dispatch_command() {
        let mut registry = CommandRegistry::new();
        registry.command("/ping", |event| async move {
            event.respond(MessageCreate::ephemeral_text("Pong!")).await
        });
        let router = registry.seal().unwrap();

        let (sink, mut rx) = ResponseSink::channel(4);
        router
            .dispatch(command("/ping"), ResponseContext::with_sink("1", sink))
            .await
            .unwrap();

        let response = rx.recv().await.unwrap();
        assert!(matches!(
            response,
            InteractionResponse::Message { message, .. }
                if message.content.as_deref() == Some("Pong!")
        ));
    }

    #[tokio::test]
    async fn test_dispatch_autocomplete_and_command_share_path() {
        let mut registry = CommandRegistry::new();
        registry.route("/wiki", |r| {
            r.autocomplete("/", |event| async move { event.result(Vec::new()).await });
            r.command("/", |event| async move {
                event.respond(MessageCreate::ephemeral_text("found")).await
            });
        });
        let router = registry.seal().unwrap();

        let (sink, mut rx) = ResponseSink::channel(4);
        router
            .dispatch(autocomplete("/wiki"), ResponseContext::with_sink("1", sink.clone()))
            .await
            .unwrap();
        router
            .dispatch(command("/wiki"), ResponseContext::with_sink("2", sink))
            .await
            .unwrap();

        assert!(matches!(
            rx.recv().await.unwrap(),
            InteractionResponse::AutocompleteResult { .. }
        ));
        assert!(matches!(
            rx.recv().await.unwrap(),
            InteractionResponse::Message { .. }
        ));
    }

    #[tokio::test]
    async fn test_dispatch_unknown_paths() {
        let mut registry = CommandRegistry::new();
        registry.command("/ping", |_| async { Ok(()) });
        let router = registry.seal().unwrap();

        let err = router
            .dispatch(command("/nope"), ResponseContext::new("1"))
            .await
            .unwrap_err();
        assert!(matches!(err, FinderError::CommandNotFound(p) if p == "/nope"));

        let err = router
            .dispatch(autocomplete("/ping"), ResponseContext::new("1"))
            .await
            .unwrap_err();
        assert!(matches!(err, FinderError::AutocompleteNotFound(p) if p == "/ping"));
    }

    #[tokio::test]
    async fn test_dispatch_propagates_handler_error() {
        let mut registry = CommandRegistry::new();
        registry.command("/fail", |_| async { Err(FinderError::NotFound) });
        let router = registry.seal().unwrap();

        let result = router
            .dispatch(command("/fail"), ResponseContext::new("1"))
            .await;
        assert!(matches!(result, Err(FinderError::NotFound)));
    }

    #[test]
    fn test_router_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Router>();
    }
}
