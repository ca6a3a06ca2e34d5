//! Daily mood tracker.
//!
//! # Invariants
//! - One mood per user per day, stored at id `<email>_<YYYY-MM-DD>`.
//! - Setting a mood again for the same day replaces it.

use crate::auth::{normalize_email, AuthorizedUser};
use crate::model::activity::day_key;
use crate::model::records::{Mood, MoodEntry, CREATED_AT, DATE, MOODS};
use crate::service::{now_ms, ServiceResult};
use crate::store::{DocumentStore, JsonMap, Order, Query, SetMode};
use chrono::NaiveDate;
use log::info;
use serde_json::Value;
use std::sync::Arc;

const USER_EMAIL: &str = "userEmail";

pub fn mood_id(email: &str, date: NaiveDate) -> String {
    format!("{}_{}", normalize_email(email), day_key(date))
}

#[derive(Clone)]
pub struct MoodService {
    store: Arc<dyn DocumentStore>,
}

impl MoodService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn set(
        &self,
        user: &AuthorizedUser,
        date: NaiveDate,
        mood: Mood,
    ) -> ServiceResult<MoodEntry> {
        let id = mood_id(user.email(), date);
        let mut data = JsonMap::new();
        data.insert(USER_EMAIL.to_string(), Value::from(user.email()));
        data.insert(DATE.to_string(), Value::from(day_key(date)));
        data.insert("mood".to_string(), Value::from(mood.label()));
        data.insert(CREATED_AT.to_string(), Value::from(now_ms()));
        self.store.set(MOODS, &id, data, SetMode::Overwrite)?;
        info!("event=mood_set module=service status=ok id={id}");

        Ok(MoodEntry {
            id,
            user_email: Some(user.email().to_string()),
            date: Some(day_key(date)),
            mood: Some(mood),
        })
    }

    pub fn on(&self, email: &str, date: NaiveDate) -> ServiceResult<Option<MoodEntry>> {
        Ok(self
            .store
            .get(MOODS, &mood_id(email, date))?
            .map(|doc| MoodEntry::from_document(&doc)))
    }

    /// Moods of one user, latest day first.
    pub fn for_user(&self, email: &str) -> ServiceResult<Vec<MoodEntry>> {
        let query = Query::collection(MOODS)
            .where_eq(USER_EMAIL, normalize_email(email))
            .order_by(DATE, Order::Desc);
        Ok(self
            .store
            .query(&query)?
            .iter()
            .map(MoodEntry::from_document)
            .collect())
    }
}
