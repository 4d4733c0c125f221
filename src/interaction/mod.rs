//! Interaction module - incoming events and the reply channel.
//!
//! Provides:
//! - [`Interaction`] - an incoming command or autocomplete request
//! - [`InteractionResponse`] - what goes back for it
//! - [`ResponseContext`] - allows handlers to answer exactly once
//! - [`CommandEvent`] / [`AutocompleteEvent`] - what handlers receive
//!
//! # Example
//!
//! ```ignore
//! use cc_finder::embed::MessageCreate;
//! use cc_finder::interaction::CommandEvent;
//!
//! async fn ping(event: CommandEvent) -> cc_finder::Result<()> {
//!     event.respond(MessageCreate::ephemeral_text("Pong!")).await
//! }
//! ```

mod context;
mod event;

pub use context::ResponseContext;
pub use event::{
    AutocompleteEvent, CommandData, CommandEvent, Interaction, InteractionResponse, OptionBag,
    OptionValue,
};
