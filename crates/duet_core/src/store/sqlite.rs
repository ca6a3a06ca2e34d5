//! SQLite-backed document store.
//!
//! # Responsibility
//! - Persist JSON documents in the `documents` table.
//! - Evaluate filters with SQLite JSON functions.
//! - Fan committed writes out to live listeners.
//!
//! # Invariants
//! - Every write path runs inside one transaction, single writes included.
//! - Change notifications are emitted after commit and after the connection
//!   lock is released.

use super::batch::{WriteBatch, WriteOp, MAX_BATCH_OPERATIONS};
use super::document::{
    merge_json, validate_collection, validate_field_path, DocListener, Document, DocumentStore,
    JsonMap, QueryListener, SetMode,
};
use super::query::{Filter, Order, Query};
use super::{StoreError, StoreResult};
use crate::sync::{ListenerSet, Subscription};
use log::{debug, error};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// Connection handle shared by the document and blob adapters.
pub type SharedConnection = Arc<Mutex<Connection>>;

pub fn share_connection(conn: Connection) -> SharedConnection {
    Arc::new(Mutex::new(conn))
}

/// Ids touched in one collection by one committed write.
#[derive(Debug, Clone)]
struct ChangeSet {
    collection: String,
    ids: Vec<String>,
}

impl ChangeSet {
    fn touches(&self, collection: &str, id: &str) -> bool {
        self.collection == collection && self.ids.iter().any(|changed| changed == id)
    }
}

struct StoreInner {
    conn: SharedConnection,
    changes: ListenerSet<ChangeSet>,
}

/// Document store over one SQLite connection.
///
/// Cloning is cheap and yields a handle to the same store and listeners.
#[derive(Clone)]
pub struct SqliteDocumentStore {
    inner: Arc<StoreInner>,
}

impl SqliteDocumentStore {
    /// Wraps a migrated connection (see [`crate::db::open_db`]).
    pub fn new(conn: Connection) -> Self {
        Self::from_shared(share_connection(conn))
    }

    pub fn from_shared(conn: SharedConnection) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                conn,
                changes: ListenerSet::new(),
            }),
        }
    }

    /// Returns the underlying connection handle, e.g. for a blob store.
    pub fn connection(&self) -> SharedConnection {
        Arc::clone(&self.inner.conn)
    }

    /// Number of live subscriptions.
    pub fn listener_count(&self) -> usize {
        self.inner.changes.len()
    }
}

impl StoreInner {
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        validate_collection(collection)?;
        let conn = self.lock();
        read_doc(&conn, collection, id)
    }

    fn query(&self, query: &Query) -> StoreResult<Vec<Document>> {
        validate_query(query)?;
        let conn = self.lock();
        run_query(&conn, query)
    }

    fn apply(&self, ops: Vec<WriteOp>) -> StoreResult<()> {
        if ops.is_empty() {
            return Ok(());
        }
        if ops.len() > MAX_BATCH_OPERATIONS {
            return Err(StoreError::BatchTooLarge {
                operations: ops.len(),
                limit: MAX_BATCH_OPERATIONS,
            });
        }
        for op in &ops {
            validate_collection(op.collection())?;
        }

        {
            let mut conn = self.lock();
            let tx = conn.transaction()?;
            for op in &ops {
                if let Err(err) = apply_op(&tx, op) {
                    error!(
                        "event=store_write module=store status=error collection={} ops={} error={}",
                        op.collection(),
                        ops.len(),
                        err
                    );
                    return Err(err);
                }
            }
            tx.commit()?;
        }

        debug!("event=store_write module=store status=ok ops={}", ops.len());
        for change in group_changes(&ops) {
            self.changes.notify(&change);
        }
        Ok(())
    }
}

impl DocumentStore for SqliteDocumentStore {
    fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        self.inner.get(collection, id)
    }

    fn set(&self, collection: &str, id: &str, data: JsonMap, mode: SetMode) -> StoreResult<()> {
        self.inner.apply(vec![WriteOp::Set {
            collection: collection.to_string(),
            id: id.to_string(),
            data,
            mode,
        }])
    }

    fn add(&self, collection: &str, data: JsonMap) -> StoreResult<String> {
        let id = Uuid::new_v4().simple().to_string();
        self.set(collection, &id, data, SetMode::Overwrite)?;
        Ok(id)
    }

    fn update(&self, collection: &str, id: &str, fields: JsonMap) -> StoreResult<()> {
        self.inner.apply(vec![WriteOp::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
        }])
    }

    fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        self.inner.apply(vec![WriteOp::Delete {
            collection: collection.to_string(),
            id: id.to_string(),
        }])
    }

    fn query(&self, query: &Query) -> StoreResult<Vec<Document>> {
        self.inner.query(query)
    }

    fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        self.inner.apply(batch.into_ops())
    }

    fn subscribe_doc(
        &self,
        collection: &str,
        id: &str,
        listener: DocListener,
    ) -> StoreResult<Subscription> {
        validate_collection(collection)?;
        let listener: Arc<dyn Fn(StoreResult<Option<Document>>) + Send + Sync> =
            Arc::from(listener);
        let weak = Arc::downgrade(&self.inner);
        let watched_collection = collection.to_string();
        let watched_id = id.to_string();
        let on_change = Arc::clone(&listener);

        // Register before the initial read so no commit can fall in between.
        let subscription = self.inner.changes.add(move |change| {
            if !change.touches(&watched_collection, &watched_id) {
                return;
            }
            if let Some(inner) = weak.upgrade() {
                on_change(inner.get(&watched_collection, &watched_id));
            }
        });

        listener(self.inner.get(collection, id));
        Ok(subscription)
    }

    fn subscribe_query(
        &self,
        query: Query,
        listener: QueryListener,
    ) -> StoreResult<Subscription> {
        validate_query(&query)?;
        let listener: Arc<dyn Fn(StoreResult<Vec<Document>>) + Send + Sync> = Arc::from(listener);
        let weak = Arc::downgrade(&self.inner);
        let watched = query.clone();
        let on_change = Arc::clone(&listener);

        let subscription = self.inner.changes.add(move |change| {
            if change.collection != watched.collection {
                return;
            }
            if let Some(inner) = weak.upgrade() {
                on_change(inner.query(&watched));
            }
        });

        listener(self.inner.query(&query));
        Ok(subscription)
    }
}

fn validate_query(query: &Query) -> StoreResult<()> {
    validate_collection(&query.collection)?;
    for filter in &query.filters {
        validate_field_path(filter.field())?;
    }
    if let Some(order_by) = &query.order_by {
        validate_field_path(&order_by.field)?;
    }
    Ok(())
}

fn read_doc(conn: &Connection, collection: &str, id: &str) -> StoreResult<Option<Document>> {
    let body: Option<String> = conn
        .query_row(
            "SELECT body FROM documents WHERE collection = ?1 AND id = ?2;",
            params![collection, id],
            |row| row.get(0),
        )
        .optional()?;

    match body {
        Some(body) => Ok(Some(Document::new(id, parse_body(&body)?))),
        None => Ok(None),
    }
}

fn write_body(conn: &Connection, collection: &str, id: &str, data: &JsonMap) -> StoreResult<()> {
    let body = serde_json::to_string(data)?;
    conn.execute(
        "INSERT INTO documents (collection, id, body) VALUES (?1, ?2, ?3)
         ON CONFLICT (collection, id) DO UPDATE SET
            body = excluded.body,
            updated_at = (strftime('%s', 'now') * 1000);",
        params![collection, id, body],
    )?;
    Ok(())
}

fn apply_op(conn: &Connection, op: &WriteOp) -> StoreResult<()> {
    match op {
        WriteOp::Set {
            collection,
            id,
            data,
            mode: SetMode::Overwrite,
        } => write_body(conn, collection, id, data),
        WriteOp::Set {
            collection,
            id,
            data,
            mode: SetMode::Merge,
        } => {
            let merged = match read_doc(conn, collection, id)? {
                Some(existing) => {
                    let mut body = existing.data;
                    merge_json(&mut body, data.clone());
                    body
                }
                None => data.clone(),
            };
            write_body(conn, collection, id, &merged)
        }
        WriteOp::Update {
            collection,
            id,
            fields,
        } => {
            let mut body = read_doc(conn, collection, id)?
                .ok_or_else(|| StoreError::NotFound {
                    collection: collection.clone(),
                    id: id.clone(),
                })?
                .data;
            for (key, value) in fields {
                body.insert(key.clone(), value.clone());
            }
            write_body(conn, collection, id, &body)
        }
        WriteOp::Delete { collection, id } => {
            conn.execute(
                "DELETE FROM documents WHERE collection = ?1 AND id = ?2;",
                params![collection, id],
            )?;
            Ok(())
        }
    }
}

fn run_query(conn: &Connection, query: &Query) -> StoreResult<Vec<Document>> {
    let mut sql = String::from("SELECT id, body FROM documents WHERE collection = ?");
    let mut binds: Vec<SqlValue> = vec![SqlValue::Text(query.collection.clone())];

    for filter in &query.filters {
        let path = json_path(filter.field());
        match filter {
            Filter::Eq(_, Value::Null) => {
                sql.push_str(" AND json_type(body, ?) = 'null'");
                binds.push(SqlValue::Text(path));
            }
            Filter::Eq(field, value) => {
                sql.push_str(" AND json_extract(body, ?) = ?");
                binds.push(SqlValue::Text(path));
                binds.push(to_sql_value(field, value)?);
            }
            Filter::Gte(field, value) | Filter::Lte(field, value) => {
                let comparison = if matches!(filter, Filter::Gte(..)) {
                    ">="
                } else {
                    "<="
                };
                // Ranges only match values of the same JSON type as the bound.
                sql.push_str(&format!(
                    " AND json_type(body, ?) IN ({}) AND json_extract(body, ?) {comparison} ?",
                    json_types_for(field, value)?
                ));
                binds.push(SqlValue::Text(path.clone()));
                binds.push(SqlValue::Text(path));
                binds.push(to_sql_value(field, value)?);
            }
        }
    }

    match &query.order_by {
        Some(order_by) => {
            let path = json_path(&order_by.field);
            let direction = match order_by.order {
                Order::Asc => "ASC",
                Order::Desc => "DESC",
            };
            sql.push_str(&format!(
                " AND json_type(body, ?) IS NOT NULL ORDER BY json_extract(body, ?) {direction}, created_at ASC, rowid ASC"
            ));
            binds.push(SqlValue::Text(path.clone()));
            binds.push(SqlValue::Text(path));
        }
        None => sql.push_str(" ORDER BY created_at ASC, rowid ASC"),
    }

    if let Some(limit) = query.limit {
        sql.push_str(" LIMIT ?");
        binds.push(SqlValue::Integer(i64::from(limit)));
    }

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(binds))?;
    let mut documents = Vec::new();
    while let Some(row) = rows.next()? {
        let id: String = row.get(0)?;
        let body: String = row.get(1)?;
        documents.push(Document::new(id, parse_body(&body)?));
    }
    Ok(documents)
}

fn parse_body(body: &str) -> StoreResult<JsonMap> {
    Ok(serde_json::from_str::<JsonMap>(body)?)
}

fn json_path(field: &str) -> String {
    format!("$.{field}")
}

fn to_sql_value(field: &str, value: &Value) -> StoreResult<SqlValue> {
    match value {
        Value::String(text) => Ok(SqlValue::Text(text.clone())),
        Value::Bool(flag) => Ok(SqlValue::Integer(i64::from(*flag))),
        Value::Number(number) => match number.as_i64() {
            Some(integer) => Ok(SqlValue::Integer(integer)),
            None => number
                .as_f64()
                .map(SqlValue::Real)
                .ok_or_else(|| StoreError::InvalidField(format!("{field}: unsupported number"))),
        },
        Value::Null | Value::Array(_) | Value::Object(_) => Err(StoreError::InvalidField(
            format!("{field}: unsupported filter value"),
        )),
    }
}

fn json_types_for(field: &str, value: &Value) -> StoreResult<&'static str> {
    match value {
        Value::Number(_) => Ok("'integer', 'real'"),
        Value::String(_) => Ok("'text'"),
        Value::Bool(_) => Ok("'true', 'false'"),
        Value::Null | Value::Array(_) | Value::Object(_) => Err(StoreError::InvalidField(
            format!("{field}: unsupported range value"),
        )),
    }
}

fn group_changes(ops: &[WriteOp]) -> Vec<ChangeSet> {
    let mut grouped: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for op in ops {
        grouped
            .entry(op.collection())
            .or_default()
            .push(op.id().to_string());
    }
    grouped
        .into_iter()
        .map(|(collection, ids)| ChangeSet {
            collection: collection.to_string(),
            ids,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{group_changes, SqliteDocumentStore};
    use crate::db::open_db_in_memory;
    use crate::store::{DocumentStore, JsonMap, Order, Query, SetMode, WriteBatch, WriteOp};
    use serde_json::json;

    fn object(value: serde_json::Value) -> JsonMap {
        value.as_object().cloned().expect("test value is an object")
    }

    fn store() -> SqliteDocumentStore {
        SqliteDocumentStore::new(open_db_in_memory().expect("in-memory db should open"))
    }

    #[test]
    fn group_changes_collects_ids_per_collection() {
        let ops = vec![
            WriteOp::Delete {
                collection: "a".into(),
                id: "1".into(),
            },
            WriteOp::Delete {
                collection: "b".into(),
                id: "2".into(),
            },
            WriteOp::Delete {
                collection: "a".into(),
                id: "3".into(),
            },
        ];
        let changes = group_changes(&ops);
        assert_eq!(changes.len(), 2);
        assert!(changes[0].touches("a", "3"));
        assert!(!changes[0].touches("b", "2"));
    }

    #[test]
    fn order_by_skips_records_missing_the_field() {
        let store = store();
        store
            .set("goals", "g1", object(json!({"createdAt": 10})), SetMode::Overwrite)
            .expect("set g1");
        store
            .set("goals", "g2", object(json!({"text": "no ts"})), SetMode::Overwrite)
            .expect("set g2");
        store
            .set("goals", "g3", object(json!({"createdAt": 30})), SetMode::Overwrite)
            .expect("set g3");

        let ids: Vec<String> = store
            .query(&Query::collection("goals").order_by("createdAt", Order::Desc))
            .expect("query")
            .into_iter()
            .map(|doc| doc.id)
            .collect();
        assert_eq!(ids, vec!["g3".to_string(), "g1".to_string()]);
    }

    #[test]
    fn range_filter_ignores_values_of_other_types() {
        let store = store();
        store
            .set("letters", "num", object(json!({"createdAt": 50})), SetMode::Overwrite)
            .expect("set num");
        store
            .set("letters", "text", object(json!({"createdAt": "50"})), SetMode::Overwrite)
            .expect("set text");

        let hits = store
            .query(&Query::collection("letters").where_between("createdAt", 0, 100))
            .expect("query");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "num");
    }

    #[test]
    fn empty_batch_is_a_no_op() {
        let store = store();
        store.commit(WriteBatch::new()).expect("empty batch commits");
    }
}
