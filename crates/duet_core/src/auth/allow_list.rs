//! Fixed membership list of accounts allowed into the diary.

use super::provider::Identity;
use crate::config::AppConfig;
use std::collections::BTreeSet;

/// Trims and lowercases an email for comparison.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Identity that passed the allow-list check.
///
/// Only produced by [`AllowList::authorize`], so holding one proves the
/// check happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedUser {
    uid: String,
    email: String,
    display_name: Option<String>,
}

impl AuthorizedUser {
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Normalized email.
    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowList {
    emails: BTreeSet<String>,
}

impl AllowList {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            emails: emails
                .into_iter()
                .map(|email| normalize_email(email.as_ref()))
                .filter(|email| !email.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.allowed_emails)
    }

    pub fn contains(&self, email: &str) -> bool {
        self.emails.contains(&normalize_email(email))
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }

    /// Returns the application user for `identity`, or `None` when its
    /// email is missing or not listed.
    pub fn authorize(&self, identity: &Identity) -> Option<AuthorizedUser> {
        let email = identity.email.as_deref().map(normalize_email)?;
        if !self.emails.contains(&email) {
            return None;
        }
        Some(AuthorizedUser {
            uid: identity.uid.clone(),
            email,
            display_name: identity.display_name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::AllowList;
    use crate::auth::Identity;

    #[test]
    fn membership_ignores_case_and_whitespace() {
        let list = AllowList::new(["A@Example.com ", "b@example.com"]);
        assert_eq!(list.len(), 2);
        assert!(list.contains("a@example.com"));
        assert!(list.contains("  B@EXAMPLE.COM"));
        assert!(!list.contains("c@example.com"));
    }

    #[test]
    fn authorize_requires_a_listed_email() {
        let list = AllowList::new(["a@example.com"]);
        let listed = Identity::new("u1", Some("A@example.com"));
        let stranger = Identity::new("u2", Some("x@example.com"));
        let anonymous = Identity::new("u3", None);

        let user = list.authorize(&listed).expect("listed identity is authorized");
        assert_eq!(user.email(), "a@example.com");
        assert_eq!(user.uid(), "u1");
        assert!(list.authorize(&stranger).is_none());
        assert!(list.authorize(&anonymous).is_none());
    }
}
