//! Calendar activity aggregation.
//!
//! # Responsibility
//! - Compute which days of a month carry at least one record.
//! - List the records of one selected day.
//!
//! # Invariants
//! - Ranged sources match `createdAt` within the month, bounds inclusive.
//! - The exact-match source is scanned whole for its `date` day key.
//! - Records with a missing or malformed timestamp or day key are skipped.
//! - The result is a plain union: presence only, no counts.

use crate::config::ActivityConfig;
use crate::model::activity::{day_key, local_day_key, parse_day_key, ActivityMap, MillisRange};
use crate::model::records::{CREATED_AT, DATE};
use crate::service::{ServiceError, ServiceResult};
use crate::store::{Document, DocumentStore, Query};
use chrono::{Local, NaiveDate, TimeZone};
use log::{debug, info};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Computes the month's activity in the local time zone.
///
/// `month_index` is 0-based (0 = January).
pub fn compute_month_activity(
    store: &dyn DocumentStore,
    year: i32,
    month_index: u32,
    ranged_collections: &[&str],
    exact_match_collection: &str,
) -> ServiceResult<ActivityMap> {
    compute_month_activity_in(
        store,
        &Local,
        year,
        month_index,
        ranged_collections,
        exact_match_collection,
    )
}

/// Computes the month's activity with day keys derived in `tz`.
pub fn compute_month_activity_in<Tz: TimeZone>(
    store: &dyn DocumentStore,
    tz: &Tz,
    year: i32,
    month_index: u32,
    ranged_collections: &[&str],
    exact_match_collection: &str,
) -> ServiceResult<ActivityMap> {
    let range = MillisRange::month(tz, year, month_index).ok_or_else(|| {
        ServiceError::InvalidInput(format!(
            "no such month: year={year} month_index={month_index} (expected 0..=11)"
        ))
    })?;

    let mut activity = ActivityMap::new();
    let mut skipped = 0usize;

    for collection in ranged_collections {
        let docs = store.query(&ranged_query(collection, &range))?;
        for doc in &docs {
            match doc
                .i64_field(CREATED_AT)
                .filter(|created_at| range.contains(*created_at))
                .and_then(|created_at| local_day_key(tz, created_at))
            {
                Some(key) => activity.mark(key),
                None => skipped += 1,
            }
        }
    }

    for doc in store.query(&Query::collection(exact_match_collection))? {
        match doc.str_field(DATE).and_then(parse_day_key) {
            Some(date) => activity.mark(day_key(date)),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!("event=month_activity module=activity status=degraded skipped={skipped}");
    }
    info!(
        "event=month_activity module=activity status=ok year={year} month_index={month_index} active_days={}",
        activity.len()
    );
    Ok(activity)
}

fn ranged_query(collection: &str, range: &MillisRange) -> Query {
    Query::collection(collection).where_between(CREATED_AT, range.start_ms, range.end_ms)
}

/// Records of one local day, keyed by collection name.
pub fn day_activity_in<Tz: TimeZone>(
    store: &dyn DocumentStore,
    tz: &Tz,
    date: NaiveDate,
    ranged_collections: &[&str],
    exact_match_collection: &str,
) -> ServiceResult<BTreeMap<String, Vec<Document>>> {
    let range = MillisRange::day(tz, date)
        .ok_or_else(|| ServiceError::InvalidInput(format!("no such local day: {date}")))?;
    let key = day_key(date);

    let mut by_collection = BTreeMap::new();
    for collection in ranged_collections {
        let docs = store.query(&ranged_query(collection, &range))?;
        by_collection.insert(collection.to_string(), docs);
    }
    let reminders = store.query(&Query::collection(exact_match_collection).where_eq(DATE, key))?;
    by_collection.insert(exact_match_collection.to_string(), reminders);
    Ok(by_collection)
}

/// Activity queries bound to the configured collections.
#[derive(Clone)]
pub struct ActivityService {
    store: Arc<dyn DocumentStore>,
    config: ActivityConfig,
}

impl ActivityService {
    pub fn new(store: Arc<dyn DocumentStore>, config: ActivityConfig) -> Self {
        Self { store, config }
    }

    fn ranged(&self) -> Vec<&str> {
        self.config
            .ranged_collections
            .iter()
            .map(String::as_str)
            .collect()
    }

    pub fn month(&self, year: i32, month_index: u32) -> ServiceResult<ActivityMap> {
        self.month_in(&Local, year, month_index)
    }

    pub fn month_in<Tz: TimeZone>(
        &self,
        tz: &Tz,
        year: i32,
        month_index: u32,
    ) -> ServiceResult<ActivityMap> {
        compute_month_activity_in(
            self.store.as_ref(),
            tz,
            year,
            month_index,
            &self.ranged(),
            &self.config.exact_match_collection,
        )
    }

    pub fn day(&self, date: NaiveDate) -> ServiceResult<BTreeMap<String, Vec<Document>>> {
        self.day_in(&Local, date)
    }

    pub fn day_in<Tz: TimeZone>(
        &self,
        tz: &Tz,
        date: NaiveDate,
    ) -> ServiceResult<BTreeMap<String, Vec<Document>>> {
        day_activity_in(
            self.store.as_ref(),
            tz,
            date,
            &self.ranged(),
            &self.config.exact_match_collection,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::compute_month_activity_in;
    use crate::db::open_db_in_memory;
    use crate::service::ServiceError;
    use crate::store::{DocumentStore, SqliteDocumentStore};
    use chrono::Utc;
    use serde_json::json;

    fn store() -> SqliteDocumentStore {
        SqliteDocumentStore::new(open_db_in_memory().expect("in-memory db"))
    }

    fn put(store: &SqliteDocumentStore, collection: &str, value: serde_json::Value) {
        store
            .add(collection, value.as_object().cloned().expect("object"))
            .expect("add record");
    }

    #[test]
    fn month_index_out_of_range_is_input_error() {
        let store = store();
        let err = compute_month_activity_in(&store, &Utc, 2026, 12, &["diaryEntries"], "events")
            .expect_err("month 12 is invalid");
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[test]
    fn month_bounds_are_inclusive() {
        let store = store();
        // 2026-02-01T00:00:00.000Z and 2026-02-28T23:59:59.999Z
        put(&store, "letters", json!({"createdAt": 1_769_904_000_000_i64}));
        put(&store, "letters", json!({"createdAt": 1_772_323_199_999_i64}));
        // 2026-03-01T00:00:00.000Z
        put(&store, "letters", json!({"createdAt": 1_772_323_200_000_i64}));

        let activity = compute_month_activity_in(&store, &Utc, 2026, 1, &["letters"], "events")
            .expect("activity");
        let keys: Vec<&str> = activity.keys().collect();
        assert_eq!(keys, vec!["2026-02-01", "2026-02-28"]);
    }

    #[test]
    fn malformed_exact_match_dates_are_skipped() {
        let store = store();
        put(&store, "events", json!({"date": "2026-2-5"}));
        put(&store, "events", json!({"date": 20260205}));
        put(&store, "events", json!({"title": "no date"}));
        put(&store, "events", json!({"date": "2026-02-09"}));

        let activity = compute_month_activity_in(&store, &Utc, 2026, 1, &[], "events")
            .expect("activity");
        assert_eq!(activity.keys().collect::<Vec<_>>(), vec!["2026-02-09"]);
    }
}
