//! Access control over an external identity provider.
//!
//! # Responsibility
//! - Define the identity provider SPI the application signs in through.
//! - Restrict application access to a fixed allow-list of emails.
//!
//! # Invariants
//! - An identity that is not on the allow-list never becomes an
//!   application user, even while the provider session is valid.
//! - Email comparison is trimmed and case-insensitive.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod allow_list;
pub mod gate;
pub mod provider;

pub use allow_list::{normalize_email, AllowList, AuthorizedUser};
pub use gate::{AccessNotice, AuthState, SessionGate};
pub use provider::{Identity, IdentityProvider, SessionListener};

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Failure reported by the identity provider.
    Provider { code: String, message: String },
    /// Signed in, but the email is not on the allow-list.
    Unauthorized { email: Option<String> },
    /// No application user is signed in.
    NotSignedIn,
}

impl AuthError {
    pub fn provider(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl Display for AuthError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Provider { code, message } => write!(f, "identity provider error [{code}]: {message}"),
            Self::Unauthorized { email: Some(email) } => {
                write!(f, "account `{email}` is not allowed to use this diary")
            }
            Self::Unauthorized { email: None } => {
                write!(f, "account without an email is not allowed to use this diary")
            }
            Self::NotSignedIn => write!(f, "not signed in"),
        }
    }
}

impl Error for AuthError {}
