//! # cc-finder
//!
//! Command dispatch and record lookup for a slash-command bot.
//!
//! Interactions arrive from a gateway process, are routed by command path,
//! resolved against a document store and answered with a single reply.
//!
//! ## Architecture
//!
//! - **Router**: path → command handler (+ optional autocomplete handler),
//!   sealed at startup
//! - **Store**: prefix search, find-one, upsert and delete over a collection
//! - **Commands**: `/ping`, and `/wiki` lookup with live autocomplete
//! - **Bridge**: line-delimited JSON over stdio to the gateway
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use cc_finder::{commands, store::MemoryStore, writer::ResponseSink, Bot};
//!
//! #[tokio::main]
//! async fn main() -> cc_finder::Result<()> {
//!     let store = Arc::new(MemoryStore::new());
//!     let (tx, rx) = tokio::sync::mpsc::channel(64);
//!     let (sink, mut responses) = ResponseSink::channel(64);
//!
//!     let mut bot = Bot::builder()
//!         .registry(commands::registry(store, &Default::default()))
//!         .start(rx, sink)?;
//!
//!     // feed `tx`, read `responses` ...
//!     bot.wait_for_shutdown().await
//! }
//! ```

pub mod commands;
pub mod config;
pub mod embed;
pub mod error;
pub mod interaction;
pub mod record;
pub mod router;
pub mod store;
pub mod transport;
pub mod writer;

mod bot;

pub use bot::{Bot, BotBuilder};
pub use error::{FinderError, Result};
pub use interaction::{AutocompleteEvent, CommandEvent, ResponseContext};
pub use record::{Record, Suggestion};
