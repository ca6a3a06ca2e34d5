//! Document shape and the document store contract.

use super::batch::WriteBatch;
use super::query::Query;
use super::{StoreError, StoreResult};
use crate::sync::Subscription;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

static COLLECTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("valid collection regex"));
static FIELD_SEGMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]{1,64}$").expect("valid field regex"));

/// Top-level JSON object stored as one document body.
pub type JsonMap = serde_json::Map<String, Value>;

/// Callback for document snapshots. `None` means the document is absent.
pub type DocListener = Box<dyn Fn(StoreResult<Option<Document>>) + Send + Sync>;

/// Callback for query snapshots carrying the full re-evaluated result.
pub type QueryListener = Box<dyn Fn(StoreResult<Vec<Document>>) + Send + Sync>;

/// One stored record. Any field may be missing; readers must not assume
/// presence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub id: String,
    pub data: JsonMap,
}

impl Document {
    pub fn new(id: impl Into<String>, data: JsonMap) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    /// Resolves a dotted field path such as `couple.partnerAName`.
    pub fn field(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.data.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    pub fn str_field(&self, path: &str) -> Option<&str> {
        self.field(path).and_then(Value::as_str)
    }

    pub fn i64_field(&self, path: &str) -> Option<i64> {
        self.field(path).and_then(Value::as_i64)
    }

    pub fn bool_field(&self, path: &str) -> Option<bool> {
        self.field(path).and_then(Value::as_bool)
    }

    /// Flattens into `{ "id": ..., ...fields }` for export.
    pub fn to_export_value(&self) -> Value {
        let mut flattened = JsonMap::with_capacity(self.data.len() + 1);
        flattened.insert("id".to_string(), Value::String(self.id.clone()));
        for (key, value) in &self.data {
            if key != "id" {
                flattened.insert(key.clone(), value.clone());
            }
        }
        Value::Object(flattened)
    }
}

/// Write mode for [`DocumentStore::set`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetMode {
    /// Replace the whole body.
    Overwrite,
    /// Merge into the existing body; nested objects merge recursively.
    Merge,
}

/// Contract of the hosted document database.
///
/// Implementations must be shareable across threads; feature services hold
/// them as `Arc<dyn DocumentStore>`.
pub trait DocumentStore: Send + Sync {
    fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Creates or replaces one document by id.
    fn set(&self, collection: &str, id: &str, data: JsonMap, mode: SetMode) -> StoreResult<()>;

    /// Creates a document under a generated id and returns that id.
    fn add(&self, collection: &str, data: JsonMap) -> StoreResult<String>;

    /// Replaces the given top-level fields of an existing document.
    ///
    /// Fails with [`StoreError::NotFound`] when the document is absent.
    fn update(&self, collection: &str, id: &str, fields: JsonMap) -> StoreResult<()>;

    /// Deletes one document. Deleting an absent document succeeds.
    fn delete(&self, collection: &str, id: &str) -> StoreResult<()>;

    fn query(&self, query: &Query) -> StoreResult<Vec<Document>>;

    /// Applies every operation atomically.
    fn commit(&self, batch: WriteBatch) -> StoreResult<()>;

    /// Delivers the current snapshot immediately, then again after every
    /// committed write to the document.
    fn subscribe_doc(
        &self,
        collection: &str,
        id: &str,
        listener: DocListener,
    ) -> StoreResult<Subscription>;

    /// Delivers the current result immediately, then again after every
    /// committed write to the query's collection.
    fn subscribe_query(&self, query: Query, listener: QueryListener)
        -> StoreResult<Subscription>;
}

pub fn validate_collection(name: &str) -> StoreResult<()> {
    if COLLECTION_RE.is_match(name) {
        Ok(())
    } else {
        Err(StoreError::InvalidCollection(name.to_string()))
    }
}

pub fn validate_field_path(path: &str) -> StoreResult<()> {
    if !path.is_empty() && path.split('.').all(|segment| FIELD_SEGMENT_RE.is_match(segment)) {
        Ok(())
    } else {
        Err(StoreError::InvalidField(path.to_string()))
    }
}

/// Merges `patch` into `target`; objects merge key by key, everything else
/// is replaced.
pub(crate) fn merge_json(target: &mut JsonMap, patch: JsonMap) {
    for (key, value) in patch {
        match value {
            Value::Object(incoming) => {
                if let Some(Value::Object(existing)) = target.get_mut(&key) {
                    merge_json(existing, incoming);
                    continue;
                }
                target.insert(key, Value::Object(incoming));
            }
            other => {
                target.insert(key, other);
            }
        }
    }
}
