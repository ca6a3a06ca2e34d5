//! Usage counters for the stats screen.

use crate::model::records::{CREATED_AT, DIARY_ENTRIES, LETTERS, MEMORIES};
use crate::service::ServiceResult;
use crate::store::{DocumentStore, Order, Query};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    pub diary_entries: usize,
    pub letters: usize,
    pub memories: usize,
    /// `createdAt` of the oldest diary entry.
    pub first_diary_entry_at: Option<i64>,
}

pub fn usage_stats(store: &dyn DocumentStore) -> ServiceResult<UsageStats> {
    let count = |collection: &str| -> ServiceResult<usize> {
        Ok(store.query(&Query::collection(collection))?.len())
    };

    let first = store.query(
        &Query::collection(DIARY_ENTRIES)
            .order_by(CREATED_AT, Order::Asc)
            .limit(1),
    )?;

    Ok(UsageStats {
        diary_entries: count(DIARY_ENTRIES)?,
        letters: count(LETTERS)?,
        memories: count(MEMORIES)?,
        first_diary_entry_at: first.first().and_then(|doc| doc.i64_field(CREATED_AT)),
    })
}
