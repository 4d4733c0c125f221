//! `/wiki` lookup and autocomplete.
//!
//! While the user types `query`, [`Wiki::autocomplete`] offers up to 25
//! record names starting with what was typed. Picking one submits the
//! record's hex key, which [`Wiki::lookup`] resolves and renders.

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::WikiConfig;
use crate::embed::{lookup_embed, MessageCreate};
use crate::error::{FinderError, Result};
use crate::interaction::{AutocompleteEvent, CommandEvent};
use crate::record::{Record, RecordId, RecordSummary, Suggestion};
use crate::router::{CommandDeclaration, CommandRegistry, HandlerResult, OptionDeclaration};
use crate::store::DocumentStore;

/// Name of the searched option.
pub const QUERY_OPTION: &str = "query";

pub fn declaration() -> CommandDeclaration {
    CommandDeclaration::new("wiki", "Search the wiki").option(
        OptionDeclaration::string(QUERY_OPTION, "The name of the card to search for")
            .required()
            .autocomplete(),
    )
}

/// Register `/wiki` with both of its handlers.
pub fn register(registry: &mut CommandRegistry, wiki: Arc<Wiki>) {
    registry.route("/wiki", |r| {
        let suggest = wiki.clone();
        r.autocomplete("/", move |event| {
            let wiki = suggest.clone();
            async move { wiki.autocomplete(event).await }
        });

        let lookup = wiki.clone();
        r.command("/", move |event| {
            let wiki = lookup.clone();
            async move { wiki.lookup(event).await }
        });
    });
}

/// Lookup and autocomplete over one collection.
pub struct Wiki {
    store: Arc<dyn DocumentStore>,
    config: WikiConfig,
}

impl Wiki {
    pub fn new(store: Arc<dyn DocumentStore>, config: WikiConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &WikiConfig {
        &self.config
    }

    /// Fetch one record by its hex key, bounded by the lookup timeout.
    pub async fn find(&self, raw_id: &str) -> Result<Record> {
        let id = RecordId::parse(raw_id)?;
        let timeout = self.config.lookup_timeout;

        let doc = tokio::time::timeout(
            timeout,
            self.store.find_one(&self.config.collection, id.filter()),
        )
        .await
        .map_err(|_| FinderError::Timeout(timeout))??;

        Record::from_document(doc)
    }

    /// Answer a submitted `/wiki` with a single ephemeral embed.
    ///
    /// Every failure is rendered into the reply; the only error returned is
    /// a failure to deliver it.
    pub async fn lookup(&self, event: CommandEvent) -> HandlerResult {
        let query = event.options().string(QUERY_OPTION).unwrap_or_default();

        let result = self.find(query).await;
        match &result {
            Ok(record) => tracing::debug!(id = %record.id, name = %record.name, "Lookup hit"),
            Err(e) => tracing::info!(query, "Lookup failed: {}", e),
        }

        event
            .respond(MessageCreate::ephemeral_embed(lookup_embed(&result)))
            .await
    }

    /// Suggestions for a partial name.
    ///
    /// Never fails: store errors and the deadline both degrade to an empty
    /// list. Partial results are discarded when the deadline elapses.
    pub async fn suggest(&self, query: &str) -> Vec<Suggestion> {
        let deadline = self.config.autocomplete_timeout;

        match tokio::time::timeout(deadline, self.collect_suggestions(query)).await {
            Ok(Ok(choices)) => choices,
            Ok(Err(e)) => {
                tracing::warn!(query, "Error getting records: {}", e);
                Vec::new()
            }
            Err(_) => {
                tracing::warn!(query, "Autocomplete timed out after {:?}", deadline);
                Vec::new()
            }
        }
    }

    async fn collect_suggestions(&self, query: &str) -> Result<Vec<Suggestion>> {
        let cap = self.config.max_suggestions;
        let mut cursor = self.store.search(&self.config.collection, query).await?;

        let mut choices = Vec::with_capacity(cap);
        let mut seen_names = HashSet::new();

        while choices.len() < cap {
            let doc = match cursor.next().await {
                Some(Ok(doc)) => doc,
                Some(Err(e)) => {
                    tracing::warn!(query, "Error during cursor iteration: {}", e);
                    break;
                }
                None => break,
            };

            let summary = match RecordSummary::from_document(doc) {
                Ok(summary) => summary,
                Err(e) => {
                    tracing::warn!(query, "Skipping record: {}", e);
                    continue;
                }
            };

            if seen_names.contains(&summary.name) {
                continue;
            }
            seen_names.insert(summary.name.clone());
            choices.push(Suggestion::from(summary));
        }

        cursor.close();
        Ok(choices)
    }

    /// Answer an autocomplete request for `/wiki`.
    pub async fn autocomplete(&self, event: AutocompleteEvent) -> HandlerResult {
        let query = event.options().string(QUERY_OPTION).unwrap_or_default();
        let choices = self.suggest(query).await;
        tracing::trace!(query, count = choices.len(), "Autocomplete");
        event.result(choices).await
    }
}
