//! Shared calendar reminders stored in `events`.

use crate::auth::AuthorizedUser;
use crate::model::activity::{day_key, parse_day_key};
use crate::model::records::{Reminder, CREATED_AT, DATE, EVENTS};
use crate::service::{now_ms, required_text, ServiceError, ServiceResult};
use crate::store::{DocumentStore, JsonMap, Order, Query};
use chrono::NaiveDate;
use log::info;
use serde_json::Value;
use std::sync::Arc;

#[derive(Clone)]
pub struct ReminderService {
    store: Arc<dyn DocumentStore>,
}

impl ReminderService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Adds a reminder for the `YYYY-MM-DD` day `date`.
    pub fn add(&self, author: &AuthorizedUser, title: &str, date: &str) -> ServiceResult<String> {
        let title = required_text("title", title)?;
        let date = parse_day_key(date.trim()).ok_or_else(|| {
            ServiceError::InvalidInput(format!("date `{}` is not YYYY-MM-DD", date.trim()))
        })?;

        let mut data = JsonMap::new();
        data.insert("title".to_string(), Value::from(title));
        data.insert(DATE.to_string(), Value::from(day_key(date)));
        data.insert("createdBy".to_string(), Value::from(author.email()));
        data.insert(CREATED_AT.to_string(), Value::from(now_ms()));
        let id = self.store.add(EVENTS, data)?;
        info!("event=reminder_add module=service status=ok id={id}");
        Ok(id)
    }

    pub fn delete(&self, id: &str) -> ServiceResult<()> {
        self.store.delete(EVENTS, id)?;
        info!("event=reminder_delete module=service status=ok id={id}");
        Ok(())
    }

    pub fn on_date(&self, date: NaiveDate) -> ServiceResult<Vec<Reminder>> {
        let query = Query::collection(EVENTS).where_eq(DATE, day_key(date));
        Ok(self
            .store
            .query(&query)?
            .iter()
            .map(Reminder::from_document)
            .collect())
    }

    /// Every reminder, earliest day first.
    pub fn list(&self) -> ServiceResult<Vec<Reminder>> {
        let query = Query::collection(EVENTS).order_by(DATE, Order::Asc);
        Ok(self
            .store
            .query(&query)?
            .iter()
            .map(Reminder::from_document)
            .collect())
    }
}
