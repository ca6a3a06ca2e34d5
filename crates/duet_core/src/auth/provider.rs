//! Identity provider SPI.

use super::AuthResult;
use crate::sync::Subscription;

/// Session identity as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
    /// Federated accounts may come without an email.
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl Identity {
    pub fn new(uid: impl Into<String>, email: Option<&str>) -> Self {
        Self {
            uid: uid.into(),
            email: email.map(str::to_string),
            display_name: None,
        }
    }
}

/// Callback for session changes. `None` means signed out.
pub type SessionListener = Box<dyn Fn(Option<&Identity>) + Send + Sync>;

/// External identity service contract.
///
/// Implementations own credential handling; this crate only consumes the
/// resulting sessions.
pub trait IdentityProvider: Send + Sync {
    fn sign_in(&self, email: &str, password: &str) -> AuthResult<Identity>;

    fn sign_up(&self, email: &str, password: &str) -> AuthResult<Identity>;

    /// Runs a federated (OAuth-style) flow, e.g. `provider_id = "google"`.
    fn sign_in_federated(&self, provider_id: &str) -> AuthResult<Identity>;

    fn sign_out(&self) -> AuthResult<()>;

    fn current_identity(&self) -> Option<Identity>;

    /// Invokes `listener` once with the current session and again on every
    /// session change.
    fn on_session_change(&self, listener: SessionListener) -> Subscription;
}
