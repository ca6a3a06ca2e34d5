//! Session gate turning provider sessions into application auth state.
//!
//! # Invariants
//! - `AuthState::user` is `Some` only for allow-listed identities.
//! - A rejected identity is signed out of the provider and leaves a
//!   blocking notice until the next successful sign-in.
//! - No gate lock is held while calling the provider or listeners.

use super::allow_list::{AllowList, AuthorizedUser};
use super::provider::{Identity, IdentityProvider};
use super::{AuthError, AuthResult};
use crate::sync::{ListenerSet, Subscription};
use log::{info, warn};
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// Blocking notice shown after a rejected sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessNotice {
    NotAllowed { email: Option<String> },
}

/// Application-level authentication state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<AuthorizedUser>,
    pub notice: Option<AccessNotice>,
}

struct GateInner {
    provider: Arc<dyn IdentityProvider>,
    allow_list: AllowList,
    state: Mutex<AuthState>,
    listeners: ListenerSet<AuthState>,
}

impl GateInner {
    fn snapshot(&self) -> AuthState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Applies one provider session and returns the resulting user.
    fn handle(&self, identity: Option<&Identity>) -> AuthResult<AuthorizedUser> {
        let outcome = match identity {
            None => {
                let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
                let changed = state.user.take().is_some();
                (changed, Err(AuthError::NotSignedIn), false)
            }
            Some(identity) => match self.allow_list.authorize(identity) {
                Some(user) => {
                    let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
                    let next = AuthState {
                        user: Some(user.clone()),
                        notice: None,
                    };
                    let changed = *state != next;
                    *state = next;
                    (changed, Ok(user), false)
                }
                None => {
                    let email = identity.email.clone();
                    let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
                    let next = AuthState {
                        user: None,
                        notice: Some(AccessNotice::NotAllowed {
                            email: email.clone(),
                        }),
                    };
                    let changed = *state != next;
                    *state = next;
                    (changed, Err(AuthError::Unauthorized { email }), true)
                }
            },
        };

        let (changed, result, reject) = outcome;
        if reject {
            warn!("event=session_rejected module=auth status=degraded reason=not_allow_listed");
            if let Err(err) = self.provider.sign_out() {
                warn!("event=session_rejected module=auth status=error error={err}");
            }
        } else if result.is_ok() && changed {
            info!("event=session_accepted module=auth status=ok");
        }

        if changed {
            self.listeners.notify(&self.snapshot());
        }
        result
    }
}

/// Single owner of the application's auth state.
///
/// Construct once at startup; dropping the gate stops tracking provider
/// sessions.
pub struct SessionGate {
    inner: Arc<GateInner>,
    _provider_subscription: Subscription,
}

impl SessionGate {
    pub fn new(provider: Arc<dyn IdentityProvider>, allow_list: AllowList) -> Self {
        let inner = Arc::new(GateInner {
            provider: Arc::clone(&provider),
            allow_list,
            state: Mutex::new(AuthState::default()),
            listeners: ListenerSet::new(),
        });

        let weak: Weak<GateInner> = Arc::downgrade(&inner);
        let subscription = provider.on_session_change(Box::new(move |identity| {
            if let Some(inner) = weak.upgrade() {
                let _ = inner.handle(identity);
            }
        }));

        Self {
            inner,
            _provider_subscription: subscription,
        }
    }

    pub fn state(&self) -> AuthState {
        self.inner.snapshot()
    }

    pub fn current_user(&self) -> Option<AuthorizedUser> {
        self.inner.snapshot().user
    }

    /// Returns the signed-in user or the reason there is none.
    pub fn require_user(&self) -> AuthResult<AuthorizedUser> {
        let state = self.inner.snapshot();
        match (state.user, state.notice) {
            (Some(user), _) => Ok(user),
            (None, Some(AccessNotice::NotAllowed { email })) => {
                Err(AuthError::Unauthorized { email })
            }
            (None, None) => Err(AuthError::NotSignedIn),
        }
    }

    pub fn login(&self, email: &str, password: &str) -> AuthResult<AuthorizedUser> {
        let identity = self.inner.provider.sign_in(email, password)?;
        self.inner.handle(Some(&identity))
    }

    pub fn signup(&self, email: &str, password: &str) -> AuthResult<AuthorizedUser> {
        let identity = self.inner.provider.sign_up(email, password)?;
        self.inner.handle(Some(&identity))
    }

    pub fn login_federated(&self, provider_id: &str) -> AuthResult<AuthorizedUser> {
        let identity = self.inner.provider.sign_in_federated(provider_id)?;
        self.inner.handle(Some(&identity))
    }

    pub fn logout(&self) -> AuthResult<()> {
        self.inner.provider.sign_out()?;
        let _ = self.inner.handle(None);
        Ok(())
    }

    /// Invokes `listener` with the current state, then on every change.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&AuthState) + Send + Sync + 'static,
    {
        let listener = Arc::new(listener);
        let on_change = Arc::clone(&listener);
        let subscription = self.inner.listeners.add(move |state| on_change(state));
        listener(&self.inner.snapshot());
        subscription
    }
}
