//! Photo memory use-case service.
//!
//! # Responsibility
//! - Upload image bytes to the blob store and record the memory.
//! - Edit captions and list memories newest first.
//!
//! # Invariants
//! - Blob keys are `memories/<email>/<millis>-<file>` with both path parts
//!   reduced to `[A-Za-z0-9._-]`.
//! - The memory record is written only after the upload succeeded.

use crate::auth::AuthorizedUser;
use crate::model::records::{Memory, CREATED_AT, MEMORIES};
use crate::service::{now_ms, required_text, ServiceError, ServiceResult};
use crate::store::{BlobStore, DocumentStore, JsonMap, Order, Query};
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;

static UNSAFE_PATH_CHARS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]").expect("valid path char regex"));

/// Image upload input.
#[derive(Debug, Clone)]
pub struct ImageUpload<'a> {
    pub file_name: &'a str,
    pub content_type: &'a str,
    pub bytes: &'a [u8],
}

/// Replaces every character outside `[A-Za-z0-9._-]` with `_`.
pub fn sanitize_path_segment(value: &str) -> String {
    let cleaned = UNSAFE_PATH_CHARS_RE.replace_all(value.trim(), "_");
    // A segment made only of dots would walk up the key hierarchy.
    if cleaned.is_empty() || cleaned.chars().all(|ch| ch == '.') {
        return "_".to_string();
    }
    cleaned.into_owned()
}

pub fn memory_blob_key(author_email: &str, created_at: i64, file_name: &str) -> String {
    format!(
        "{MEMORIES}/{}/{created_at}-{}",
        sanitize_path_segment(author_email),
        sanitize_path_segment(file_name)
    )
}

#[derive(Clone)]
pub struct MemoryService {
    store: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
}

impl MemoryService {
    pub fn new(store: Arc<dyn DocumentStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { store, blobs }
    }

    pub fn create(
        &self,
        author: &AuthorizedUser,
        image: ImageUpload<'_>,
        caption: &str,
    ) -> ServiceResult<Memory> {
        if image.bytes.is_empty() {
            return Err(ServiceError::InvalidInput("image is empty".to_string()));
        }
        if !image.content_type.starts_with("image/") {
            return Err(ServiceError::InvalidInput(format!(
                "content type `{}` is not an image",
                image.content_type
            )));
        }

        let created_at = now_ms();
        let key = memory_blob_key(author.email(), created_at, image.file_name);
        let blob = self.blobs.upload(&key, image.bytes, image.content_type)?;

        let mut data = JsonMap::new();
        data.insert("imageUrl".to_string(), Value::from(blob.locator));
        data.insert("storagePath".to_string(), Value::from(blob.key));
        data.insert("caption".to_string(), Value::from(caption.trim()));
        data.insert("authorEmail".to_string(), Value::from(author.email()));
        data.insert(CREATED_AT.to_string(), Value::from(created_at));
        let id = self.store.add(MEMORIES, data)?;
        info!(
            "event=memory_create module=service status=ok id={id} size={}",
            blob.size
        );

        self.get(&id)?.ok_or(ServiceError::NotFound {
            collection: MEMORIES.to_string(),
            id,
        })
    }

    pub fn update_caption(&self, id: &str, caption: &str) -> ServiceResult<()> {
        let caption = required_text("caption", caption)?;
        let mut fields = JsonMap::new();
        fields.insert("caption".to_string(), Value::from(caption));
        self.store.update(MEMORIES, id, fields)?;
        info!("event=memory_caption module=service status=ok id={id}");
        Ok(())
    }

    pub fn get(&self, id: &str) -> ServiceResult<Option<Memory>> {
        Ok(self
            .store
            .get(MEMORIES, id)?
            .map(|doc| Memory::from_document(&doc)))
    }

    pub fn list(&self) -> ServiceResult<Vec<Memory>> {
        let query = Query::collection(MEMORIES).order_by(CREATED_AT, Order::Desc);
        Ok(self
            .store
            .query(&query)?
            .iter()
            .map(Memory::from_document)
            .collect())
    }

    /// Deletes the record; the uploaded image stays in the blob store.
    pub fn delete(&self, id: &str) -> ServiceResult<()> {
        self.store.delete(MEMORIES, id)?;
        info!("event=memory_delete module=service status=ok id={id}");
        Ok(())
    }
}
