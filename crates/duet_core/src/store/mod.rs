//! Document and blob store adapters.
//!
//! # Responsibility
//! - Define the contract every feature uses to reach persisted collections:
//!   point reads, merge writes, filtered queries, atomic batches and live
//!   subscriptions.
//! - Provide SQLite-backed implementations of the document and blob stores.
//!
//! # Invariants
//! - Collection names and field paths are validated before any SQL runs.
//! - Listeners are notified only after a write has committed.
//! - Batches above [`MAX_BATCH_OPERATIONS`] are rejected untouched.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod batch;
pub mod blobs;
pub mod document;
pub mod query;
pub mod sqlite;

pub use batch::{WriteBatch, WriteOp, MAX_BATCH_OPERATIONS};
pub use blobs::{BlobRef, BlobStore, SqliteBlobStore};
pub use document::{
    validate_collection, validate_field_path, DocListener, Document, DocumentStore, JsonMap,
    QueryListener, SetMode,
};
pub use query::{Filter, Order, OrderBy, Query};
pub use sqlite::{share_connection, SharedConnection, SqliteDocumentStore};

pub type StoreResult<T> = Result<T, StoreError>;

/// Store-level error shared by document and blob adapters.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    Json(serde_json::Error),
    InvalidCollection(String),
    InvalidField(String),
    NotFound { collection: String, id: String },
    BatchTooLarge { operations: usize, limit: usize },
    Unavailable(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Json(err) => write!(f, "invalid document body: {err}"),
            Self::InvalidCollection(name) => write!(f, "invalid collection name: `{name}`"),
            Self::InvalidField(path) => write!(f, "invalid field path: `{path}`"),
            Self::NotFound { collection, id } => {
                write!(f, "document not found: {collection}/{id}")
            }
            Self::BatchTooLarge { operations, limit } => write!(
                f,
                "write batch has {operations} operations; limit is {limit}"
            ),
            Self::Unavailable(details) => write!(f, "store unavailable: {details}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}
