//! MongoDB-backed document store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use futures::stream::StreamExt;
use mongodb::bson::{doc, Document};
use mongodb::options::{ClientOptions, ReturnDocument};
use mongodb::{Client, Collection, Database};

use super::{DocumentStore, SearchCursor, NAME_FIELD};
use crate::config::StoreConfig;
use crate::error::{FinderError, Result};

/// Interval between readiness pings while connecting.
const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Document store backed by a MongoDB database.
///
/// The client pools connections internally; one `MongoStore` is shared by
/// every handler for the life of the process.
pub struct MongoStore {
    client: Client,
    db: Database,
    closed: AtomicBool,
}

impl MongoStore {
    /// Connect and wait until the server answers `ping`.
    ///
    /// Retries every 100ms until `connect_timeout` elapses.
    pub async fn connect(cfg: &StoreConfig) -> Result<Self> {
        let options = ClientOptions::parse(&cfg.uri).await?;
        let client = Client::with_options(options)?;
        let db = client.database(&cfg.database);

        let started = Instant::now();
        let ready = tokio::time::timeout(cfg.connect_timeout, async {
            loop {
                match db.run_command(doc! { "ping": 1 }).await {
                    Ok(_) => return,
                    Err(e) => {
                        tracing::debug!("store not ready yet: {}", e);
                        tokio::time::sleep(READY_POLL_INTERVAL).await;
                    }
                }
            }
        })
        .await;

        if ready.is_err() {
            return Err(FinderError::ConnectionFailure(format!(
                "no answer from {} within {:?}",
                cfg.database, cfg.connect_timeout
            )));
        }

        tracing::info!(
            database = %cfg.database,
            elapsed = ?started.elapsed(),
            "Connected to document store"
        );

        Ok(Self {
            client,
            db,
            closed: AtomicBool::new(false),
        })
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection(name)
    }
}

/// Case-insensitive, literal starts-with filter on the name field.
pub(crate) fn prefix_filter(prefix: &str) -> Document {
    doc! {
        NAME_FIELD: {
            "$regex": format!("^{}", regex::escape(prefix)),
            "$options": "i",
        }
    }
}

impl DocumentStore for MongoStore {
    fn search<'a>(
        &'a self,
        collection: &'a str,
        prefix: &'a str,
    ) -> BoxFuture<'a, Result<SearchCursor>> {
        Box::pin(async move {
            let cursor = self
                .collection(collection)
                .find(prefix_filter(prefix))
                .projection(doc! { NAME_FIELD: 1 })
                .await?;

            // Dropping the driver cursor issues killCursors server-side.
            let stream = cursor.map(|item| item.map_err(FinderError::from)).boxed();
            Ok(SearchCursor::new(stream))
        })
    }

    fn find_one<'a>(
        &'a self,
        collection: &'a str,
        filter: Document,
    ) -> BoxFuture<'a, Result<Document>> {
        Box::pin(async move {
            self.collection(collection)
                .find_one(filter)
                .await?
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
            self.collection(collection)
                .find_one_and_update(filter, update)
                .upsert(true)
                .return_document(ReturnDocument::After)
                .await?
                .ok_or(FinderError::NotFound)
        })
    }

    fn delete_one<'a>(
        &'a self,
        collection: &'a str,
        filter: Document,
    ) -> BoxFuture<'a, Result<Document>> {
        Box::pin(async move {
            self.collection(collection)
                .find_one_and_delete(filter)
                .await?
                .ok_or(FinderError::NotFound)
        })
    }

    fn disconnect(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if self.closed.swap(true, Ordering::AcqRel) {
                return Ok(());
            }
            self.client.clone().shutdown().await;
            tracing::info!("Disconnected from document store");
            Ok(())
        })
    }
}
