//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate document and blob store calls into feature-level APIs.
//! - Stamp creation timestamps and validate user input before writes.
//!
//! # Invariants
//! - Every record a service creates carries `createdAt` in epoch millis.
//! - Services never log record content, only ids and counts.

use crate::auth::AuthError;
use crate::store::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod activity_service;
pub mod data_service;
pub mod diary_service;
pub mod goal_service;
pub mod letter_service;
pub mod memory_service;
pub mod mood_service;
pub mod preferences_service;
pub mod reminder_service;
pub mod stats_service;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug)]
pub enum ServiceError {
    /// Persistence-layer failure.
    Store(StoreError),
    /// Caller input rejected before any write.
    InvalidInput(String),
    NotFound { collection: String, id: String },
    /// No allow-listed user is signed in.
    Unauthorized(AuthError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::InvalidInput(details) => write!(f, "invalid input: {details}"),
            Self::NotFound { collection, id } => write!(f, "{collection}/{id} not found"),
            Self::Unauthorized(err) => write!(f, "unauthorized: {err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Unauthorized(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound { collection, id } => Self::NotFound { collection, id },
            other => Self::Store(other),
        }
    }
}

impl From<AuthError> for ServiceError {
    fn from(value: AuthError) -> Self {
        Self::Unauthorized(value)
    }
}

/// Current wall-clock time in epoch milliseconds.
pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Trims `value` and rejects it when nothing is left.
pub(crate) fn required_text(field: &str, value: &str) -> ServiceResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::InvalidInput(format!("{field} cannot be blank")));
    }
    Ok(trimmed.to_string())
}
