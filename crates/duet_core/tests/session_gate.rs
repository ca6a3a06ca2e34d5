use duet_core::auth::{
    AccessNotice, AllowList, AuthError, AuthResult, AuthState, Identity, IdentityProvider,
    SessionGate,
    SessionListener,
};
use duet_core::config::AppConfig;
use duet_core::service::ServiceError;
use duet_core::sync::{ListenerSet, Subscription};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Provider that accepts any registered email/password pair and keeps
/// the session until told otherwise.
#[derive(Default)]
struct InMemoryProvider {
    accounts: Mutex<BTreeMap<String, String>>,
    session: Mutex<Option<Identity>>,
    listeners: ListenerSet<Option<Identity>>,
}

impl InMemoryProvider {
    fn publish(&self, identity: Option<Identity>) {
        *self.session.lock().unwrap() = identity.clone();
        self.listeners.notify(&identity);
    }
}

impl IdentityProvider for InMemoryProvider {
    fn sign_in(&self, email: &str, password: &str) -> AuthResult<Identity> {
        let known = self.accounts.lock().unwrap().get(email).cloned();
        match known {
            Some(stored) if stored == password => {
                let identity = Identity::new(format!("uid-{email}"), Some(email));
                self.publish(Some(identity.clone()));
                Ok(identity)
            }
            _ => Err(AuthError::provider("invalid-credential", "wrong email or password")),
        }
    }

    fn sign_up(&self, email: &str, password: &str) -> AuthResult<Identity> {
        self.accounts
            .lock()
            .unwrap()
            .insert(email.to_string(), password.to_string());
        self.sign_in(email, password)
    }

    fn sign_in_federated(&self, provider_id: &str) -> AuthResult<Identity> {
        Err(AuthError::provider(
            "operation-not-allowed",
            format!("{provider_id} is not configured"),
        ))
    }

    fn sign_out(&self) -> AuthResult<()> {
        self.publish(None);
        Ok(())
    }

    fn current_identity(&self) -> Option<Identity> {
        self.session.lock().unwrap().clone()
    }

    fn on_session_change(&self, listener: SessionListener) -> Subscription {
        listener(self.current_identity().as_ref());
        self.listeners
            .add(move |identity: &Option<Identity>| listener(identity.as_ref()))
    }
}

fn gate_with_defaults() -> (Arc<InMemoryProvider>, SessionGate) {
    let provider = Arc::new(InMemoryProvider::default());
    let gate = SessionGate::new(
        provider.clone(),
        AllowList::from_config(&AppConfig::default()),
    );
    (provider, gate)
}

#[test]
fn valid_session_outside_allow_list_yields_no_user() {
    let (provider, gate) = gate_with_defaults();

    let result = gate.signup("intruder@example.com", "hunter2");

    assert!(matches!(result, Err(AuthError::Unauthorized { .. })));
    assert_eq!(gate.state().user, None);
    assert_eq!(
        gate.state().notice,
        Some(AccessNotice::NotAllowed {
            email: Some("intruder@example.com".to_string())
        })
    );
    // The provider session was ended by the gate.
    assert_eq!(provider.current_identity(), None);
}

#[test]
fn allow_listed_partner_signs_in_and_out() {
    let (_provider, gate) = gate_with_defaults();
    gate.signup("partner.b@example.com", "pw").unwrap();
    gate.logout().unwrap();
    assert!(gate.current_user().is_none());

    let user = gate.login("partner.b@example.com", "pw").unwrap();

    assert_eq!(user.email(), "partner.b@example.com");
    assert_eq!(gate.require_user().unwrap(), user);
}

#[test]
fn successful_sign_in_clears_a_previous_rejection_notice() {
    let (_provider, gate) = gate_with_defaults();
    let _ = gate.signup("intruder@example.com", "pw");
    assert!(gate.state().notice.is_some());

    gate.signup("partner.a@example.com", "pw").unwrap();

    assert!(gate.state().notice.is_none());
    assert!(gate.current_user().is_some());
}

#[test]
fn require_user_maps_to_unauthorized_service_error() {
    let (_provider, gate) = gate_with_defaults();
    let err: ServiceError = gate.require_user().unwrap_err().into();
    assert!(matches!(err, ServiceError::Unauthorized(AuthError::NotSignedIn)));
}

#[test]
fn provider_failures_leave_state_untouched() {
    let (_provider, gate) = gate_with_defaults();
    let err = gate.login("partner.a@example.com", "never-registered").unwrap_err();
    assert!(matches!(err, AuthError::Provider { .. }));
    assert!(gate.login_federated("google").is_err());
    assert_eq!(gate.state(), AuthState::default());
}
