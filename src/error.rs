//! Error types for cc-finder.

use std::time::Duration;

use thiserror::Error;

/// Main error type for all lookup, routing and store operations.
#[derive(Debug, Error)]
pub enum FinderError {
    /// Caller supplied a record key that is not a valid identifier.
    #[error("invalid record identifier: {0:?}")]
    InvalidIdentifier(String),

    /// No document matched a find-one or delete query.
    #[error("no documents in result")]
    NotFound,

    /// The store is unreachable or a query failed transport-side.
    #[error("store connection failure: {0}")]
    ConnectionFailure(String),

    /// A single document could not be decoded into the domain type.
    #[error("failed to decode record: {0}")]
    DecodeFailure(#[from] mongodb::bson::de::Error),

    /// An update document the store cannot apply.
    #[error("invalid update document: {0}")]
    InvalidUpdate(String),

    /// A store call exceeded its deadline.
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),

    /// A background task panicked or could not be joined.
    #[error("task failed: {0}")]
    TaskFailed(String),

    /// The same command or autocomplete path was registered twice.
    #[error("duplicate registration for path {0}")]
    DuplicateRoute(String),

    /// No command handler is registered for the path.
    #[error("no command handler for path {0}")]
    CommandNotFound(String),

    /// No autocomplete handler is registered for the path.
    #[error("no autocomplete handler for path {0}")]
    AutocompleteNotFound(String),

    /// A handler tried to answer the same interaction twice.
    #[error("interaction {0} was already responded to")]
    AlreadyResponded(String),

    /// The response channel was closed.
    #[error("response channel closed")]
    ConnectionClosed,

    /// Invalid startup configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error on the stdio bridge.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error on the stdio bridge.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<mongodb::error::Error> for FinderError {
    fn from(err: mongodb::error::Error) -> Self {
        FinderError::ConnectionFailure(err.to_string())
    }
}

/// Result type alias using FinderError.
pub type Result<T> = std::result::Result<T, FinderError>;
