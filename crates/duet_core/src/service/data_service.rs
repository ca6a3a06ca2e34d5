//! Export and bulk wipe of user data.
//!
//! # Responsibility
//! - Export every data collection as one JSON document.
//! - Delete whole collections in bounded atomic batches.
//!
//! # Invariants
//! - No batch carries more than `chunk_size` deletes, and `chunk_size`
//!   never exceeds the store's per-batch ceiling.
//! - Each batch commits atomically; a failure stops the wipe and leaves
//!   earlier batches committed.
//! - The preferences document is never touched.

use crate::model::activity::day_key;
use crate::model::records::DATA_COLLECTIONS;
use crate::service::{ServiceError, ServiceResult};
use crate::store::{DocumentStore, Query, WriteBatch, MAX_BATCH_OPERATIONS};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use log::{error, info};
use serde_json::{Map, Value};

/// Outcome of one collection wipe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WipeReport {
    pub collection: String,
    /// Delete count of each committed batch, in commit order.
    pub batches: Vec<usize>,
}

impl WipeReport {
    pub fn deleted(&self) -> usize {
        self.batches.iter().sum()
    }
}

/// `relationship-diary-export-YYYY-MM-DD.json`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("relationship-diary-export-{}.json", day_key(date))
}

/// Export file name for `instant`, dated by its UTC calendar day.
pub fn export_file_name_at<Tz: TimeZone>(instant: &DateTime<Tz>) -> String {
    export_file_name(instant.with_timezone(&Utc).date_naive())
}

/// Every record of the data collections as `{collection: [{id, ...}]}`.
pub fn export_all(store: &dyn DocumentStore) -> ServiceResult<Value> {
    let mut export = Map::new();
    for collection in DATA_COLLECTIONS {
        let records = store
            .query(&Query::collection(collection))?
            .iter()
            .map(|doc| doc.to_export_value())
            .collect::<Vec<_>>();
        info!(
            "event=export module=data status=ok collection={collection} records={}",
            records.len()
        );
        export.insert(collection.to_string(), Value::Array(records));
    }
    Ok(Value::Object(export))
}

/// Deletes every document of `collection`, `chunk_size` per batch.
///
/// # Errors
/// - `InvalidInput` when `chunk_size` is 0 or above the batch ceiling.
/// - `Store` when listing or a batch commit fails.
pub fn delete_collection_in_batches(
    store: &dyn DocumentStore,
    collection: &str,
    chunk_size: usize,
) -> ServiceResult<WipeReport> {
    if chunk_size == 0 || chunk_size > MAX_BATCH_OPERATIONS {
        return Err(ServiceError::InvalidInput(format!(
            "chunk size must be within 1..={MAX_BATCH_OPERATIONS}, got {chunk_size}"
        )));
    }

    let ids: Vec<String> = store
        .query(&Query::collection(collection))?
        .into_iter()
        .map(|doc| doc.id)
        .collect();

    let mut report = WipeReport {
        collection: collection.to_string(),
        batches: Vec::new(),
    };
    for chunk in ids.chunks(chunk_size) {
        let mut batch = WriteBatch::new();
        for id in chunk {
            batch.delete(collection, id.as_str());
        }
        if let Err(err) = store.commit(batch) {
            error!(
                "event=wipe_batch module=data status=error collection={collection} committed={} error={err}",
                report.deleted()
            );
            return Err(err.into());
        }
        report.batches.push(chunk.len());
    }

    info!(
        "event=wipe_collection module=data status=ok collection={collection} deleted={} batches={}",
        report.deleted(),
        report.batches.len()
    );
    Ok(report)
}

/// Wipes every data collection in export order.
pub fn wipe_all(store: &dyn DocumentStore, chunk_size: usize) -> ServiceResult<Vec<WipeReport>> {
    DATA_COLLECTIONS
        .into_iter()
        .map(|collection| delete_collection_in_batches(store, collection, chunk_size))
        .collect()
}
