use duet_core::db::open_db_in_memory;
use duet_core::model::records::{APP_META, DATA_COLLECTIONS};
use duet_core::service::data_service::{delete_collection_in_batches, export_all, wipe_all};
use duet_core::store::{
    DocumentStore, JsonMap, Query, SetMode, SqliteDocumentStore, StoreError, WriteBatch,
    MAX_BATCH_OPERATIONS,
};
use serde_json::json;
use std::sync::{Arc, Mutex};

fn store() -> SqliteDocumentStore {
    SqliteDocumentStore::new(open_db_in_memory().unwrap())
}

fn seed(store: &SqliteDocumentStore, collection: &str, count: usize) {
    let mut remaining = count;
    let mut next = 0usize;
    while remaining > 0 {
        let take = remaining.min(MAX_BATCH_OPERATIONS);
        let mut batch = WriteBatch::new();
        for _ in 0..take {
            let data: JsonMap = json!({"n": next, "createdAt": 1_771_063_200_000_i64})
                .as_object()
                .cloned()
                .unwrap();
            batch.set(collection, format!("{collection}-{next:04}"), data, SetMode::Overwrite);
            next += 1;
        }
        store.commit(batch).unwrap();
        remaining -= take;
    }
}

fn count(store: &SqliteDocumentStore, collection: &str) -> usize {
    store.query(&Query::collection(collection)).unwrap().len()
}

#[test]
fn thousand_records_are_deleted_in_chunks_of_at_most_450() {
    let store = store();
    seed(&store, "diaryEntries", 1000);
    assert_eq!(count(&store, "diaryEntries"), 1000);

    let report = delete_collection_in_batches(&store, "diaryEntries", 450).unwrap();

    assert_eq!(report.batches, vec![450, 450, 100]);
    assert!(report.batches.iter().all(|size| *size <= 450));
    assert_eq!(report.deleted(), 1000);
    assert_eq!(count(&store, "diaryEntries"), 0);
}

#[test]
fn each_batch_reaches_listeners_as_one_change() {
    let store = store();
    seed(&store, "letters", 1000);
    let sizes = Arc::new(Mutex::new(Vec::new()));
    let sink = sizes.clone();
    let _subscription = store
        .subscribe_query(
            Query::collection("letters"),
            Box::new(move |snapshot| {
                sink.lock().unwrap().push(snapshot.unwrap().len());
            }),
        )
        .unwrap();

    delete_collection_in_batches(&store, "letters", 450).unwrap();

    assert_eq!(*sizes.lock().unwrap(), vec![1000, 550, 100, 0]);
}

#[test]
fn oversized_batches_are_rejected_before_any_write() {
    let store = store();
    seed(&store, "goals", 501);
    let mut batch = WriteBatch::new();
    for n in 0..501 {
        batch.delete("goals", format!("goals-{n:04}"));
    }

    let err = store.commit(batch).unwrap_err();

    assert!(matches!(
        err,
        StoreError::BatchTooLarge {
            operations: 501,
            limit: 500
        }
    ));
    assert_eq!(count(&store, "goals"), 501);
}

#[test]
fn wipe_all_clears_data_collections_and_keeps_preferences() {
    let store = store();
    for collection in DATA_COLLECTIONS {
        seed(&store, collection, 3);
    }
    seed(&store, "goals", 2);
    store
        .set(
            APP_META,
            "settings",
            json!({"couple": {"partnerAName": "Sam"}})
                .as_object()
                .cloned()
                .unwrap(),
            SetMode::Overwrite,
        )
        .unwrap();

    let reports = wipe_all(&store, 450).unwrap();

    assert_eq!(reports.len(), DATA_COLLECTIONS.len());
    assert!(reports.iter().all(|report| report.deleted() == 3));
    for collection in DATA_COLLECTIONS {
        assert_eq!(count(&store, collection), 0);
    }
    assert!(store.get(APP_META, "settings").unwrap().is_some());
    assert_eq!(count(&store, "goals"), 2);
}

#[test]
fn export_lists_every_data_collection_with_ids() {
    let store = store();
    seed(&store, "moods", 2);

    let export = export_all(&store).unwrap();

    let object = export.as_object().unwrap();
    assert_eq!(object.len(), DATA_COLLECTIONS.len());
    assert_eq!(object["diaryEntries"], json!([]));
    let moods = object["moods"].as_array().unwrap();
    assert_eq!(moods.len(), 2);
    assert_eq!(moods[0]["id"], json!("moods-0000"));
    assert_eq!(moods[0]["n"], json!(0));
}
