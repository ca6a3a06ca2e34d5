//! Letter inbox use-case service.
//!
//! # Invariants
//! - New letters start unread.
//! - Only the recipient opening a letter marks it read.
//! - Only the sender or the recipient may delete a letter.

use crate::auth::{normalize_email, AuthError, AuthorizedUser};
use crate::model::records::{Letter, CREATED_AT, LETTERS};
use crate::service::{now_ms, required_text, ServiceError, ServiceResult};
use crate::store::{DocumentStore, JsonMap, Order, Query};
use crate::sync::Subscription;
use log::{info, warn};
use serde_json::Value;
use std::sync::Arc;

const RECIPIENT_EMAIL: &str = "recipientEmail";
const SENDER_EMAIL: &str = "senderEmail";
const READ: &str = "read";

fn is_party(email: Option<&str>, viewer: &AuthorizedUser) -> bool {
    email.map(normalize_email).as_deref() == Some(viewer.email())
}

#[derive(Clone)]
pub struct LetterService {
    store: Arc<dyn DocumentStore>,
}

impl LetterService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn inbox_query(recipient_email: &str) -> Query {
        Query::collection(LETTERS)
            .where_eq(RECIPIENT_EMAIL, normalize_email(recipient_email))
            .order_by(CREATED_AT, Order::Desc)
    }

    pub fn send(
        &self,
        sender: &AuthorizedUser,
        recipient_email: &str,
        subject: &str,
        body: &str,
    ) -> ServiceResult<String> {
        let recipient = normalize_email(&required_text("recipient", recipient_email)?);
        let body = required_text("body", body)?;

        let mut data = JsonMap::new();
        data.insert("subject".to_string(), Value::from(subject.trim()));
        data.insert("body".to_string(), Value::from(body));
        data.insert(SENDER_EMAIL.to_string(), Value::from(sender.email()));
        data.insert(RECIPIENT_EMAIL.to_string(), Value::from(recipient));
        data.insert(READ.to_string(), Value::Bool(false));
        data.insert(CREATED_AT.to_string(), Value::from(now_ms()));

        let id = self.store.add(LETTERS, data)?;
        info!("event=letter_send module=service status=ok id={id}");
        Ok(id)
    }

    pub fn inbox(&self, recipient_email: &str) -> ServiceResult<Vec<Letter>> {
        Ok(self
            .store
            .query(&Self::inbox_query(recipient_email))?
            .iter()
            .map(Letter::from_document)
            .collect())
    }

    pub fn sent(&self, sender_email: &str) -> ServiceResult<Vec<Letter>> {
        let query = Query::collection(LETTERS)
            .where_eq(SENDER_EMAIL, normalize_email(sender_email))
            .order_by(CREATED_AT, Order::Desc);
        Ok(self
            .store
            .query(&query)?
            .iter()
            .map(Letter::from_document)
            .collect())
    }

    fn load(&self, id: &str) -> ServiceResult<Letter> {
        let doc = self
            .store
            .get(LETTERS, id)?
            .ok_or_else(|| ServiceError::NotFound {
                collection: LETTERS.to_string(),
                id: id.to_string(),
            })?;
        Ok(Letter::from_document(&doc))
    }

    /// Returns the letter and marks it read when `viewer` is its recipient.
    pub fn open(&self, id: &str, viewer: &AuthorizedUser) -> ServiceResult<Letter> {
        let mut letter = self.load(id)?;

        if is_party(letter.recipient_email.as_deref(), viewer) && !letter.read {
            let mut fields = JsonMap::new();
            fields.insert(READ.to_string(), Value::Bool(true));
            self.store.update(LETTERS, id, fields)?;
            letter.read = true;
            info!("event=letter_read module=service status=ok id={id}");
        }
        Ok(letter)
    }

    pub fn unread_count(&self, recipient_email: &str) -> ServiceResult<usize> {
        let query = Query::collection(LETTERS)
            .where_eq(RECIPIENT_EMAIL, normalize_email(recipient_email))
            .where_eq(READ, false);
        Ok(self.store.query(&query)?.len())
    }

    pub fn delete(&self, id: &str, viewer: &AuthorizedUser) -> ServiceResult<()> {
        let letter = self.load(id)?;
        if !is_party(letter.sender_email.as_deref(), viewer)
            && !is_party(letter.recipient_email.as_deref(), viewer)
        {
            warn!("event=letter_delete module=service status=rejected id={id}");
            return Err(ServiceError::Unauthorized(AuthError::Unauthorized {
                email: Some(viewer.email().to_string()),
            }));
        }
        self.store.delete(LETTERS, id)?;
        info!("event=letter_delete module=service status=ok id={id}");
        Ok(())
    }

    /// Live inbox for `recipient_email`, newest first.
    pub fn subscribe_inbox<F>(
        &self,
        recipient_email: &str,
        on_change: F,
    ) -> ServiceResult<Subscription>
    where
        F: Fn(ServiceResult<Vec<Letter>>) + Send + Sync + 'static,
    {
        Ok(self.store.subscribe_query(
            Self::inbox_query(recipient_email),
            Box::new(move |snapshot| {
                on_change(
                    snapshot
                        .map(|docs| docs.iter().map(Letter::from_document).collect())
                        .map_err(ServiceError::from),
                )
            }),
        )?)
    }
}
