//! Diary entry use-case service.
//!
//! # Invariants
//! - Entry bodies are non-blank after trimming.
//! - Lists are newest first by `createdAt`.

use crate::auth::AuthorizedUser;
use crate::model::records::{DiaryEntry, CREATED_AT, DIARY_ENTRIES};
use crate::service::{now_ms, required_text, ServiceError, ServiceResult};
use crate::store::{DocumentStore, JsonMap, Order, Query};
use crate::sync::Subscription;
use log::info;
use serde_json::Value;
use std::sync::Arc;

#[derive(Clone)]
pub struct DiaryService {
    store: Arc<dyn DocumentStore>,
}

impl DiaryService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn newest_first() -> Query {
        Query::collection(DIARY_ENTRIES).order_by(CREATED_AT, Order::Desc)
    }

    pub fn create(
        &self,
        author: &AuthorizedUser,
        title: &str,
        body: &str,
    ) -> ServiceResult<DiaryEntry> {
        let body = required_text("body", body)?;
        let mut data = JsonMap::new();
        data.insert("title".to_string(), Value::from(title.trim()));
        data.insert("body".to_string(), Value::from(body));
        data.insert("authorEmail".to_string(), Value::from(author.email()));
        data.insert(CREATED_AT.to_string(), Value::from(now_ms()));

        let id = self.store.add(DIARY_ENTRIES, data)?;
        info!("event=diary_create module=service status=ok id={id}");
        self.get(&id)?.ok_or(ServiceError::NotFound {
            collection: DIARY_ENTRIES.to_string(),
            id,
        })
    }

    /// Replaces title and body of an existing entry.
    pub fn update(&self, id: &str, title: &str, body: &str) -> ServiceResult<()> {
        let body = required_text("body", body)?;
        let mut fields = JsonMap::new();
        fields.insert("title".to_string(), Value::from(title.trim()));
        fields.insert("body".to_string(), Value::from(body));
        self.store.update(DIARY_ENTRIES, id, fields)?;
        info!("event=diary_update module=service status=ok id={id}");
        Ok(())
    }

    pub fn get(&self, id: &str) -> ServiceResult<Option<DiaryEntry>> {
        Ok(self
            .store
            .get(DIARY_ENTRIES, id)?
            .map(|doc| DiaryEntry::from_document(&doc)))
    }

    pub fn delete(&self, id: &str) -> ServiceResult<()> {
        self.store.delete(DIARY_ENTRIES, id)?;
        info!("event=diary_delete module=service status=ok id={id}");
        Ok(())
    }

    pub fn list(&self) -> ServiceResult<Vec<DiaryEntry>> {
        Ok(self
            .store
            .query(&Self::newest_first())?
            .iter()
            .map(DiaryEntry::from_document)
            .collect())
    }

    pub fn latest(&self) -> ServiceResult<Option<DiaryEntry>> {
        Ok(self
            .store
            .query(&Self::newest_first().limit(1))?
            .first()
            .map(DiaryEntry::from_document))
    }

    /// Live newest-first list.
    pub fn subscribe<F>(&self, on_change: F) -> ServiceResult<Subscription>
    where
        F: Fn(ServiceResult<Vec<DiaryEntry>>) + Send + Sync + 'static,
    {
        Ok(self.store.subscribe_query(
            Self::newest_first(),
            Box::new(move |snapshot| {
                on_change(
                    snapshot
                        .map(|docs| docs.iter().map(DiaryEntry::from_document).collect())
                        .map_err(ServiceError::from),
                )
            }),
        )?)
    }
}
