//! Transport module - the stdio bridge to the gateway process.
//!
//! - **stdin**: one [`Interaction`](crate::interaction::Interaction) per line
//! - **stdout**: the sync control line, then one response per line
//! - **stderr**: logs, never parsed by the gateway
//!
//! Responses are written by the [`writer`](crate::writer) task; this module
//! covers reading interactions and the one-off control line.

mod stdio;

pub use stdio::{read_interactions, spawn_stdin_reader, write_stdout_line};
