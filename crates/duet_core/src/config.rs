//! Application configuration.
//!
//! # Responsibility
//! - Load the TOML config file shared by the CLI and embedding hosts.
//! - Provide defaults for every key so an empty file is valid.
//!
//! # Invariants
//! - A config returned by [`AppConfig::load`] or
//!   [`AppConfig::from_toml_str`] has passed [`AppConfig::validate`].

use crate::logging::default_log_level;
use crate::model::records::{DIARY_ENTRIES, EVENTS, LETTERS, MEMORIES};
use crate::store::{validate_collection, MAX_BATCH_OPERATIONS};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Default operations per bulk-delete batch, kept under the store ceiling.
pub const DEFAULT_BATCH_CHUNK_SIZE: usize = 450;

const DEFAULT_DATABASE_PATH: &str = "duet.sqlite3";
const DEFAULT_ALLOWED_EMAILS: [&str; 2] = ["partner.a@example.com", "partner.b@example.com"];

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(toml::de::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config: {err}"),
            Self::Invalid(details) => write!(f, "invalid config: {details}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

/// Collections feeding the calendar activity dots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityConfig {
    /// Matched by `createdAt` range.
    pub ranged_collections: Vec<String>,
    /// Scanned wholesale for an explicit `date` day key.
    pub exact_match_collection: String,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            ranged_collections: [DIARY_ENTRIES, MEMORIES, LETTERS]
                .into_iter()
                .map(str::to_string)
                .collect(),
            exact_match_collection: EVENTS.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub log_level: String,
    /// Absolute directory for rolling logs; logging stays off when unset.
    pub log_dir: Option<PathBuf>,
    pub allowed_emails: Vec<String>,
    pub batch_chunk_size: usize,
    pub activity: ActivityConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            log_level: default_log_level().to_string(),
            log_dir: None,
            allowed_emails: DEFAULT_ALLOWED_EMAILS
                .into_iter()
                .map(str::to_string)
                .collect(),
            batch_chunk_size: DEFAULT_BATCH_CHUNK_SIZE,
            activity: ActivityConfig::default(),
        }
    }
}

impl AppConfig {
    /// Reads and validates a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.allowed_emails.is_empty() {
            return Err(ConfigError::Invalid(
                "allowed_emails must name at least one account".to_string(),
            ));
        }
        if let Some(invalid) = self
            .allowed_emails
            .iter()
            .find(|email| !email.contains('@') || email.trim().is_empty())
        {
            return Err(ConfigError::Invalid(format!(
                "allowed_emails entry `{invalid}` is not an email address"
            )));
        }
        if self.batch_chunk_size == 0 || self.batch_chunk_size > MAX_BATCH_OPERATIONS {
            return Err(ConfigError::Invalid(format!(
                "batch_chunk_size must be within 1..={MAX_BATCH_OPERATIONS}, got {}",
                self.batch_chunk_size
            )));
        }
        for name in self
            .activity
            .ranged_collections
            .iter()
            .chain(std::iter::once(&self.activity.exact_match_collection))
        {
            validate_collection(name)
                .map_err(|err| ConfigError::Invalid(format!("activity: {err}")))?;
        }
        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "log_dir must be an absolute path, got `{}`",
                    dir.display()
                )));
            }
        }
        Ok(())
    }
}
