//! Shared goals with a done flag.

use crate::auth::AuthorizedUser;
use crate::model::records::{Goal, CREATED_AT, GOALS};
use crate::service::{now_ms, required_text, ServiceError, ServiceResult};
use crate::store::{DocumentStore, JsonMap, Order, Query};
use log::info;
use serde_json::Value;
use std::sync::Arc;

#[derive(Clone)]
pub struct GoalService {
    store: Arc<dyn DocumentStore>,
}

impl GoalService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn add(&self, author: &AuthorizedUser, text: &str) -> ServiceResult<String> {
        let text = required_text("text", text)?;
        let mut data = JsonMap::new();
        data.insert("text".to_string(), Value::from(text));
        data.insert("done".to_string(), Value::Bool(false));
        data.insert("createdBy".to_string(), Value::from(author.email()));
        data.insert(CREATED_AT.to_string(), Value::from(now_ms()));
        let id = self.store.add(GOALS, data)?;
        info!("event=goal_add module=service status=ok id={id}");
        Ok(id)
    }

    /// Flips `done` and returns the new value.
    pub fn toggle(&self, id: &str) -> ServiceResult<bool> {
        let doc = self
            .store
            .get(GOALS, id)?
            .ok_or_else(|| ServiceError::NotFound {
                collection: GOALS.to_string(),
                id: id.to_string(),
            })?;
        let done = !Goal::from_document(&doc).done;
        let mut fields = JsonMap::new();
        fields.insert("done".to_string(), Value::Bool(done));
        self.store.update(GOALS, id, fields)?;
        info!("event=goal_toggle module=service status=ok id={id} done={done}");
        Ok(done)
    }

    pub fn delete(&self, id: &str) -> ServiceResult<()> {
        self.store.delete(GOALS, id)?;
        Ok(())
    }

    pub fn list(&self) -> ServiceResult<Vec<Goal>> {
        let query = Query::collection(GOALS).order_by(CREATED_AT, Order::Desc);
        Ok(self
            .store
            .query(&query)?
            .iter()
            .map(Goal::from_document)
            .collect())
    }
}
