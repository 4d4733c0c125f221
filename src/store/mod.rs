//! Store module - document store adapter.
//!
//! Provides:
//! - [`DocumentStore`] - prefix search, find-one, upsert and delete over a
//!   named collection
//! - [`SearchCursor`] - lazy, forward-only search results with guaranteed
//!   release
//! - [`MongoStore`] - MongoDB-backed implementation
//! - [`MemoryStore`] - in-process implementation
//!
//! Every future returned by a store is safe to drop. Callers bound each call
//! with `tokio::time::timeout`; dropping the future cancels the call.
//!
//! # Example
//!
//! ```ignore
//! use cc_finder::store::{DocumentStore, MemoryStore};
//!
//! let store = MemoryStore::new();
//! let mut cursor = store.search("tcs", "fire").await?;
//! while let Some(doc) = cursor.next().await {
//!     println!("{:?}", doc?);
//! }
//! ```

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

use futures::future::BoxFuture;
use futures::stream::{BoxStream, StreamExt};
use mongodb::bson::Document;

use crate::error::Result;

/// Field that prefix search matches against.
pub const NAME_FIELD: &str = "name";

/// Trait for document store backends.
///
/// Implementations are shared as `Arc<dyn DocumentStore>` across every
/// in-flight handler.
pub trait DocumentStore: Send + Sync + 'static {
    /// Case-insensitive starts-with search on the name field.
    ///
    /// Only `_id` and `name` are returned for each match.
    fn search<'a>(&'a self, collection: &'a str, prefix: &'a str)
        -> BoxFuture<'a, Result<SearchCursor>>;

    /// Fetch exactly one document matching `filter`, or `NotFound`.
    fn find_one<'a>(&'a self, collection: &'a str, filter: Document)
        -> BoxFuture<'a, Result<Document>>;

    /// Apply `update` to the first match of `filter`, inserting when nothing
    /// matches. Returns the document as it is after the update.
    fn upsert<'a>(
        &'a self,
        collection: &'a str,
        filter: Document,
        update: Document,
    ) -> BoxFuture<'a, Result<Document>>;

    /// Remove the first match of `filter` and return it, or `NotFound`.
    fn delete_one<'a>(&'a self, collection: &'a str, filter: Document)
        -> BoxFuture<'a, Result<Document>>;

    /// Release the underlying connection. Calls after the first are no-ops.
    fn disconnect(&self) -> BoxFuture<'_, Result<()>>;
}

type CloseHook = Box<dyn FnOnce() + Send>;

/// Lazy search result sequence.
///
/// Finite, forward-only and not restartable. The underlying stream is
/// released exactly once: on [`close`](Self::close) or, failing that, on drop.
pub struct SearchCursor {
    stream: Option<BoxStream<'static, Result<Document>>>,
    on_close: Option<CloseHook>,
}

impl SearchCursor {
    /// Wrap a stream of documents.
    pub fn new(stream: BoxStream<'static, Result<Document>>) -> Self {
        Self {
            stream: Some(stream),
            on_close: None,
        }
    }

    /// Cursor over already-materialized documents.
    pub fn from_documents(docs: Vec<Document>) -> Self {
        Self::new(futures::stream::iter(docs.into_iter().map(Ok)).boxed())
    }

    /// Run `hook` when the cursor is released.
    pub fn on_close<F>(mut self, hook: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_close = Some(Box::new(hook));
        self
    }

    /// Next document, or `None` once exhausted or closed.
    pub async fn next(&mut self) -> Option<Result<Document>> {
        match self.stream.as_mut() {
            Some(stream) => stream.next().await,
            None => None,
        }
    }

    /// Release the underlying stream. Safe to call more than once.
    pub fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            if let Some(hook) = self.on_close.take() {
                hook();
            }
        }
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }
}

impl Drop for SearchCursor {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_cursor(docs: Vec<Document>) -> (SearchCursor, Arc<AtomicUsize>) {
        let closes = Arc::new(AtomicUsize::new(0));
        let counter = closes.clone();
        let cursor = SearchCursor::from_documents(docs).on_close(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (cursor, closes)
    }

    #[tokio::test]
    async fn test_cursor_yields_in_order_then_none() {
        let (mut cursor, _) = counting_cursor(vec![doc! { "n": 1 }, doc! { "n": 2 }]);

        assert_eq!(cursor.next().await.unwrap().unwrap(), doc! { "n": 1 });
        assert_eq!(cursor.next().await.unwrap().unwrap(), doc! { "n": 2 });
        assert!(cursor.next().await.is_none());
    }

    #[tokio::test]
    async fn test_close_runs_hook_once() {
        let (mut cursor, closes) = counting_cursor(vec![doc! { "n": 1 }]);

        cursor.close();
        cursor.close();
        assert!(cursor.is_closed());
        assert!(cursor.next().await.is_none());
        drop(cursor);

        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_drop_releases_unclosed_cursor() {
        let (mut cursor, closes) = counting_cursor(vec![doc! { "n": 1 }, doc! { "n": 2 }]);

        // Early break: consume one item, then drop.
        assert!(cursor.next().await.is_some());
        drop(cursor);

        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }
}
