//! Response context for handlers.
//!
//! Provides methods for answering an interaction:
//! - `respond` - send a message
//! - `result` - send autocomplete suggestions
//!
//! An interaction gets exactly one reply. Whichever method is called first
//! wins; later calls fail with `AlreadyResponded`. A reply that could not be
//! delivered does not count.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::InteractionResponse;
use crate::embed::MessageCreate;
use crate::error::{FinderError, Result};
use crate::record::Suggestion;
use crate::writer::ResponseSink;

/// Context passed to handlers for replying to one interaction.
///
/// `ResponseContext` is `Clone`; clones share the "already responded" state.
#[derive(Clone)]
pub struct ResponseContext {
    /// Interaction being answered.
    interaction_id: String,
    /// Sink for outgoing responses.
    sink: Option<ResponseSink>,
    responded: Arc<AtomicBool>,
}

impl ResponseContext {
    /// Create a context that discards responses (for testing without a sink).
    pub fn new(interaction_id: &str) -> Self {
        Self {
            interaction_id: interaction_id.to_string(),
            sink: None,
            responded: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a context that delivers responses to `sink`.
    pub fn with_sink(interaction_id: &str, sink: ResponseSink) -> Self {
        Self {
            interaction_id: interaction_id.to_string(),
            sink: Some(sink),
            responded: Arc::new(AtomicBool::new(false)),
        }
    }

    #[inline]
    pub fn interaction_id(&self) -> &str {
        &self.interaction_id
    }

    #[inline]
    pub fn has_responded(&self) -> bool {
        self.responded.load(Ordering::Acquire)
    }

    /// Send a message reply.
    pub async fn respond(&self, message: MessageCreate) -> Result<()> {
        self.send(InteractionResponse::Message {
            interaction_id: self.interaction_id.clone(),
            message,
        })
        .await
    }

    /// Send autocomplete suggestions.
    pub async fn result(&self, choices: Vec<Suggestion>) -> Result<()> {
        self.send(InteractionResponse::AutocompleteResult {
            interaction_id: self.interaction_id.clone(),
            choices,
        })
        .await
    }

    /// Claims the single reply, then delivers it. A failed delivery
    /// releases the claim so the reply can be retried.
    async fn send(&self, response: InteractionResponse) -> Result<()> {
        if self.responded.swap(true, Ordering::AcqRel) {
            return Err(FinderError::AlreadyResponded(self.interaction_id.clone()));
        }

        let Some(sink) = &self.sink else {
            // No sink configured (testing mode)
            return Ok(());
        };

        let result = sink.send(response).await;
        if result.is_err() {
            self.responded.store(false, Ordering::Release);
        }
        result
    }
}
