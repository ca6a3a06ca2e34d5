//! Core domain logic for Duet, a private diary shared by two people.
//! This crate is the single source of truth for business invariants.

pub mod auth;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;
pub mod sync;

pub use auth::{
    AllowList, AuthError, AuthState, AuthorizedUser, Identity, IdentityProvider, SessionGate,
};
pub use config::{AppConfig, ConfigError};
pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::activity::ActivityMap;
pub use model::preferences::{PreferenceDocument, PreferencePatch};
pub use service::activity_service::{
    compute_month_activity, compute_month_activity_in, ActivityService,
};
pub use service::data_service::{delete_collection_in_batches, export_all, wipe_all, WipeReport};
pub use service::preferences_service::PreferencesStore;
pub use service::{ServiceError, ServiceResult};
pub use store::{DocumentStore, SqliteBlobStore, SqliteDocumentStore, StoreError, StoreResult};
pub use sync::Subscription;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
