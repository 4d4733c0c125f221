//! Router module - command registration and dispatch.
//!
//! Provides:
//! - [`CommandRegistry`] - collects command and autocomplete handlers by path
//! - [`Router`] - the sealed, read-only mapping used to dispatch
//! - [`CommandDeclaration`] - command descriptions synced to the platform
//!
//! # Example
//!
//! ```ignore
//! use cc_finder::embed::MessageCreate;
//! use cc_finder::router::CommandRegistry;
//!
//! let mut registry = CommandRegistry::new();
//!
//! registry.command("/ping", |event| async move {
//!     event.respond(MessageCreate::ephemeral_text("Pong!")).await
//! });
//!
//! registry.route("/wiki", |r| {
//!     r.autocomplete("/", |event| async move { event.result(Vec::new()).await });
//!     r.command("/", |event| async move { Ok(()) });
//! });
//!
//! let router = registry.seal()?;
//! ```

mod registry;
mod schema;

pub use registry::{
    join_path, normalize_path, AutocompleteHandler, CommandHandler, CommandRegistry,
    FnAutocompleteHandler, FnCommandHandler, HandlerResult, Route, Router,
};
pub use schema::{
    build_sync_message, CommandDeclaration, OptionDeclaration, OptionKind, SyncScope, SYNC_OP,
};
