//! In-process document store.
//!
//! Collections keep insertion order, which is the natural iteration order
//! for search results. Supports top-level equality filters and the `$set`,
//! `$setOnInsert` and `$unset` update operators (or whole-document
//! replacement).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::stream::StreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{Bson, Document};
use parking_lot::{Mutex, RwLock};

use super::{DocumentStore, SearchCursor, NAME_FIELD};
use crate::error::{FinderError, Result};

const ID_FIELD: &str = "_id";

/// In-memory [`DocumentStore`] with fault injection.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    unreachable: AtomicBool,
    disconnected: AtomicBool,
    latency: Mutex<Option<Duration>>,
    closed_cursors: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a document, assigning a fresh `_id` when it has none.
    ///
    /// Returns the document's `_id`.
    pub fn insert(&self, collection: &str, mut doc: Document) -> Bson {
        if !doc.contains_key(ID_FIELD) {
            doc.insert(ID_FIELD, ObjectId::new());
        }
        let id = doc.get(ID_FIELD).cloned().unwrap_or(Bson::Null);
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .push(doc);
        id
    }

    /// Number of documents in a collection.
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map_or(0, |docs| docs.len())
    }

    /// Make every subsequent call fail with `ConnectionFailure`.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::Release);
    }

    /// Delay each search item by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock() = latency;
    }

    /// How many search cursors have been released so far.
    pub fn closed_cursors(&self) -> usize {
        self.closed_cursors.load(Ordering::Acquire)
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::Acquire)
    }

    fn check_reachable(&self) -> Result<()> {
        if self.disconnected.load(Ordering::Acquire) {
            return Err(FinderError::ConnectionFailure(
                "client is disconnected".to_string(),
            ));
        }
        if self.unreachable.load(Ordering::Acquire) {
            return Err(FinderError::ConnectionFailure(
                "server selection timed out".to_string(),
            ));
        }
        Ok(())
    }
}

fn matches(doc: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, value)| doc.get(key) == Some(value))
}

fn name_starts_with(doc: &Document, prefix_lower: &str) -> bool {
    match doc.get(NAME_FIELD) {
        Some(Bson::String(name)) => name.to_lowercase().starts_with(prefix_lower),
        _ => false,
    }
}

fn apply_update(target: &mut Document, update: &Document, inserting: bool) -> Result<()> {
    let is_operator = update.keys().next().is_some_and(|k| k.starts_with('$'));

    if !is_operator {
        let id = target.get(ID_FIELD).cloned();
        *target = update.clone();
        if let Some(id) = id {
            target.insert(ID_FIELD, id);
        }
        return Ok(());
    }

    for (op, fields) in update {
        let fields = match fields {
            Bson::Document(fields) => fields,
            other => {
                return Err(FinderError::InvalidUpdate(format!(
                    "modifier {} expects a document, got {}",
                    op, other
                )))
            }
        };
        match op.as_str() {
            "$set" => {
                for (k, v) in fields {
                    target.insert(k.clone(), v.clone());
                }
            }
            "$setOnInsert" if inserting => {
                for (k, v) in fields {
                    target.insert(k.clone(), v.clone());
                }
            }
            "$setOnInsert" => {}
            "$unset" => {
                for k in fields.keys() {
                    target.remove(k);
                }
            }
            other => {
                return Err(FinderError::InvalidUpdate(format!(
                    "unsupported update operator {}",
                    other
                )))
            }
        }
    }
    Ok(())
}

impl DocumentStore for MemoryStore {
    fn search<'a>(
        &'a self,
        collection: &'a str,
        prefix: &'a str,
    ) -> BoxFuture<'a, Result<SearchCursor>> {
        Box::pin(async move {
            self.check_reachable()?;

            let prefix_lower = prefix.to_lowercase();
            let hits: Vec<Document> = self
                .collections
                .read()
                .get(collection)
                .map(|docs| {
                    docs.iter()
                        .filter(|doc| name_starts_with(doc, &prefix_lower))
                        .map(|doc| {
                            let mut projected = Document::new();
                            if let Some(id) = doc.get(ID_FIELD) {
                                projected.insert(ID_FIELD, id.clone());
                            }
                            if let Some(name) = doc.get(NAME_FIELD) {
                                projected.insert(NAME_FIELD, name.clone());
                            }
                            projected
                        })
                        .collect()
                })
                .unwrap_or_default();

            let closed = self.closed_cursors.clone();
            let latency = *self.latency.lock();

            let stream = futures::stream::iter(hits.into_iter().map(Ok));
            let cursor = match latency {
                Some(delay) => SearchCursor::new(
                    stream
                        .then(move |item| async move {
                            tokio::time::sleep(delay).await;
                            item
                        })
                        .boxed(),
                ),
                None => SearchCursor::new(stream.boxed()),
            };

            Ok(cursor.on_close(move || {
                closed.fetch_add(1, Ordering::AcqRel);
            }))
        })
    }

    fn find_one<'a>(
        &'a self,
        collection: &'a str,
        filter: Document,
    ) -> BoxFuture<'a, Result<Document>> {
        Box::pin(async move {
            self.check_reachable()?;
            self.collections
                .read()
                .get(collection)
                .and_then(|docs| docs.iter().find(|doc| matches(doc, &filter)))
                .cloned()
                .ok_or(FinderError::NotFound)
        })
    }

    fn upsert<'a>(
        &'a self,
        collection: &'a str,
        filter: Document,
        update: Document,
    ) -> BoxFuture<'a, Result<Document>> {
        Box::pin(async move {
            self.check_reachable()?;
            let mut collections = self.collections.write();
            let docs = collections.entry(collection.to_string()).or_default();

            if let Some(existing) = docs.iter_mut().find(|doc| matches(doc, &filter)) {
                let mut updated = existing.clone();
                apply_update(&mut updated, &update, false)?;
                *existing = updated.clone();
                return Ok(updated);
            }

            let mut inserted = filter.clone();
            apply_update(&mut inserted, &update, true)?;
            if !inserted.contains_key(ID_FIELD) {
                inserted.insert(ID_FIELD, ObjectId::new());
            }
            docs.push(inserted.clone());
            Ok(inserted)
        })
    }

    fn delete_one<'a>(
        &'a self,
        collection: &'a str,
        filter: Document,
    ) -> BoxFuture<'a, Result<Document>> {
        Box::pin(async move {
            self.check_reachable()?;
            let mut collections = self.collections.write();
            let docs = collections
                .get_mut(collection)
                .ok_or(FinderError::NotFound)?;
            let pos = docs
                .iter()
                .position(|doc| matches(doc, &filter))
                .ok_or(FinderError::NotFound)?;
            Ok(docs.remove(pos))
        })
    }

    fn disconnect(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if !self.disconnected.swap(true, Ordering::AcqRel) {
                tracing::debug!("In-memory store disconnected");
            }
            Ok(())
        })
    }
}
