//! Binary object store contract and SQLite implementation.

use super::sqlite::SharedConnection;
use super::{StoreError, StoreResult};
use log::info;
use rusqlite::{params, OptionalExtension};
use std::sync::PoisonError;

const LOCATOR_SCHEME: &str = "blob://";

/// Result of one upload: the key and its stable download locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobRef {
    pub key: String,
    pub locator: String,
    pub size: u64,
}

/// Contract of the hosted object store.
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` under `key`, replacing any previous object.
    fn upload(&self, key: &str, bytes: &[u8], content_type: &str) -> StoreResult<BlobRef>;

    /// Returns the download locator for `key`, or `None` if nothing is stored.
    fn download_locator(&self, key: &str) -> StoreResult<Option<String>>;

    /// Reads the stored bytes back.
    fn fetch(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;
}

/// Blob store writing into the `blobs` table.
#[derive(Clone)]
pub struct SqliteBlobStore {
    conn: SharedConnection,
}

impl SqliteBlobStore {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

pub fn locator_for(key: &str) -> String {
    format!("{LOCATOR_SCHEME}{key}")
}

fn validate_key(key: &str) -> StoreResult<()> {
    let valid = !key.is_empty()
        && !key.starts_with('/')
        && !key.split('/').any(|segment| segment.is_empty() || segment == "..");
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidField(format!("blob key `{key}`")))
    }
}

impl BlobStore for SqliteBlobStore {
    fn upload(&self, key: &str, bytes: &[u8], content_type: &str) -> StoreResult<BlobRef> {
        validate_key(key)?;
        let size = bytes.len() as u64;
        {
            let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
            conn.execute(
                "INSERT INTO blobs (key, content_type, bytes, size) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (key) DO UPDATE SET
                    content_type = excluded.content_type,
                    bytes = excluded.bytes,
                    size = excluded.size;",
                params![key, content_type, bytes, size as i64],
            )?;
        }
        info!("event=blob_upload module=store status=ok size={size}");
        Ok(BlobRef {
            key: key.to_string(),
            locator: locator_for(key),
            size,
        })
    }

    fn download_locator(&self, key: &str) -> StoreResult<Option<String>> {
        validate_key(key)?;
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let exists: Option<i64> = conn
            .query_row("SELECT 1 FROM blobs WHERE key = ?1;", [key], |row| row.get(0))
            .optional()?;
        Ok(exists.map(|_| locator_for(key)))
    }

    fn fetch(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        validate_key(key)?;
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let bytes = conn
            .query_row("SELECT bytes FROM blobs WHERE key = ?1;", [key], |row| {
                row.get::<_, Vec<u8>>(0)
            })
            .optional()?;
        Ok(bytes)
    }
}
