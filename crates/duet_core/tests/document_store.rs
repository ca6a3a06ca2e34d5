use duet_core::db::open_db_in_memory;
use duet_core::store::{
    share_connection, BlobStore, DocumentStore, JsonMap, Order, Query, SetMode, SqliteBlobStore,
    SqliteDocumentStore, StoreError,
};
use serde_json::json;
use std::sync::{Arc, Mutex};

fn object(value: serde_json::Value) -> JsonMap {
    value.as_object().cloned().unwrap()
}

fn store() -> SqliteDocumentStore {
    SqliteDocumentStore::new(open_db_in_memory().unwrap())
}

#[test]
fn set_get_update_delete_lifecycle() {
    let store = store();
    store
        .set("goals", "g1", object(json!({"text": "hike", "done": false})), SetMode::Overwrite)
        .unwrap();

    store
        .update("goals", "g1", object(json!({"done": true})))
        .unwrap();
    let doc = store.get("goals", "g1").unwrap().unwrap();
    assert_eq!(doc.str_field("text"), Some("hike"));
    assert_eq!(doc.bool_field("done"), Some(true));

    store.delete("goals", "g1").unwrap();
    store.delete("goals", "g1").unwrap();
    assert!(store.get("goals", "g1").unwrap().is_none());
}

#[test]
fn update_of_missing_document_is_not_found() {
    let store = store();
    let err = store
        .update("goals", "missing", object(json!({"done": true})))
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
}

#[test]
fn merge_set_keeps_untouched_nested_fields() {
    let store = store();
    store
        .set(
            "appMeta",
            "settings",
            object(json!({"couple": {"a": 1, "b": 2}, "privacy": {"x": true}})),
            SetMode::Overwrite,
        )
        .unwrap();
    store
        .set(
            "appMeta",
            "settings",
            object(json!({"couple": {"b": 3}})),
            SetMode::Merge,
        )
        .unwrap();

    let doc = store.get("appMeta", "settings").unwrap().unwrap();
    assert_eq!(
        serde_json::Value::Object(doc.data),
        json!({"couple": {"a": 1, "b": 3}, "privacy": {"x": true}})
    );
}

#[test]
fn query_filters_orders_and_limits() {
    let store = store();
    for (id, email, created_at) in [
        ("l1", "a@example.com", 30),
        ("l2", "b@example.com", 10),
        ("l3", "a@example.com", 20),
    ] {
        store
            .set(
                "letters",
                id,
                object(json!({"recipientEmail": email, "createdAt": created_at})),
                SetMode::Overwrite,
            )
            .unwrap();
    }

    let inbox = store
        .query(
            &Query::collection("letters")
                .where_eq("recipientEmail", "a@example.com")
                .order_by("createdAt", Order::Desc),
        )
        .unwrap();
    let ids: Vec<&str> = inbox.iter().map(|doc| doc.id.as_str()).collect();
    assert_eq!(ids, vec!["l1", "l3"]);

    let oldest = store
        .query(
            &Query::collection("letters")
                .order_by("createdAt", Order::Asc)
                .limit(1),
        )
        .unwrap();
    assert_eq!(oldest[0].id, "l2");

    let ranged = store
        .query(&Query::collection("letters").where_between("createdAt", 15, 25))
        .unwrap();
    assert_eq!(ranged.len(), 1);
    assert_eq!(ranged[0].id, "l3");
}

#[test]
fn invalid_collection_names_are_rejected() {
    let store = store();
    let err = store.get("bad name; DROP", "x").unwrap_err();
    assert!(matches!(err, StoreError::InvalidCollection(_)));
}

#[test]
fn document_subscription_sees_current_state_then_each_write() {
    let store = store();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let mut subscription = store
        .subscribe_doc(
            "goals",
            "g1",
            Box::new(move |snapshot| {
                let done = snapshot.unwrap().and_then(|doc| doc.bool_field("done"));
                sink.lock().unwrap().push(done);
            }),
        )
        .unwrap();

    store
        .set("goals", "g1", object(json!({"done": false})), SetMode::Overwrite)
        .unwrap();
    // Writes to other documents are not delivered.
    store
        .set("goals", "g2", object(json!({"done": true})), SetMode::Overwrite)
        .unwrap();
    store
        .update("goals", "g1", object(json!({"done": true})))
        .unwrap();
    subscription.unsubscribe();
    store.delete("goals", "g1").unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![None, Some(false), Some(true)]);
    assert_eq!(store.listener_count(), 0);
}

#[test]
fn listeners_may_write_back_into_the_store() {
    let store = Arc::new(store());
    let writer = store.clone();
    let _subscription = store
        .subscribe_query(
            Query::collection("diaryEntries"),
            Box::new(move |snapshot| {
                let count = snapshot.map(|docs| docs.len()).unwrap_or(0);
                writer
                    .set(
                        "appMeta",
                        "counters",
                        object(json!({"diaryEntries": count})),
                        SetMode::Overwrite,
                    )
                    .unwrap();
            }),
        )
        .unwrap();

    store
        .add("diaryEntries", object(json!({"body": "hello"})))
        .unwrap();

    let counters = store.get("appMeta", "counters").unwrap().unwrap();
    assert_eq!(counters.i64_field("diaryEntries"), Some(1));
}

#[test]
fn blob_upload_overwrites_and_keeps_a_stable_locator() {
    let conn = share_connection(open_db_in_memory().unwrap());
    let blobs = SqliteBlobStore::new(conn.clone());
    let documents = SqliteDocumentStore::from_shared(conn);

    let first = blobs
        .upload("memories/a/1-photo.jpg", b"one", "image/jpeg")
        .unwrap();
    let second = blobs
        .upload("memories/a/1-photo.jpg", b"second", "image/jpeg")
        .unwrap();

    assert_eq!(first.locator, second.locator);
    assert_eq!(second.size, 6);
    assert_eq!(
        blobs.fetch("memories/a/1-photo.jpg").unwrap(),
        Some(b"second".to_vec())
    );
    assert_eq!(
        blobs.download_locator("memories/a/1-photo.jpg").unwrap(),
        Some(first.locator)
    );
    assert!(blobs.download_locator("memories/none").unwrap().is_none());
    assert!(blobs.upload("../escape", b"x", "image/png").is_err());
    assert!(documents.query(&Query::collection("memories")).unwrap().is_empty());
}
