//! Identity provider seam. The portal never authenticates users itself; it
//! drives an external provider (Firebase Authentication in production) and
//! listens to its change stream. Passwords and tokens cross this boundary as
//! `SecretString` and must never be logged.
//!
//! Flow Overview: a sign-in or registration call returns the new [`Identity`]
//! and the provider also publishes it on its watch channel; sign-out publishes
//! `None`. Token retrieval refreshes transparently when the cached token is
//! stale.

pub mod firebase;
pub mod memory;

use async_trait::async_trait;
use regex::Regex;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;

/// Authenticated principal as reported by the identity provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

/// Provider-originated failures, surfaced to the caller for user messaging.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("an account already exists for this email")]
    EmailInUse,
    #[error("password is too weak")]
    WeakPassword,
    #[error("email address is invalid")]
    InvalidEmail,
    #[error("no account found for this email")]
    NotFound,
    #[error("wrong password")]
    WrongPassword,
    #[error("sign-in popup was closed before completing")]
    PopupClosed,
    #[error("no user is signed in")]
    NotSignedIn,
    #[error("identity provider error: {0}")]
    Unknown(String),
}

/// Partial profile change; `None` leaves a field untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

impl ProfileUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.photo_url.is_none()
    }

    /// Applies the change to a local identity copy.
    pub fn apply_to(&self, identity: &mut Identity) {
        if let Some(name) = &self.display_name {
            identity.display_name = Some(name.clone());
        }
        if let Some(photo) = &self.photo_url {
            identity.photo_url = Some(photo.clone());
        }
    }
}

/// Credential handed back by a federated (popup) sign-in.
#[derive(Clone, Debug)]
pub struct FederatedCredential {
    /// Provider id as the identity service knows it, e.g. `google.com`.
    pub provider_id: String,
    pub id_token: SecretString,
}

/// Provider-hosted popup flow. Returns `None` when the user closes it.
#[async_trait]
pub trait PopupFlow: Send + Sync {
    async fn open(&self) -> Option<FederatedCredential>;
}

/// Contract every identity provider satisfies. Implementations publish every
/// identity change on the channel returned by [`IdentityProvider::watch`],
/// including an explicit `None` on sign-out.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Subscribes to identity changes. The current value is the identity at
    /// subscription time.
    fn watch(&self) -> watch::Receiver<Option<Identity>>;

    async fn create_user(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Identity, IdentityError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Identity, IdentityError>;

    async fn sign_in_with_popup(&self) -> Result<Identity, IdentityError>;

    async fn sign_out(&self) -> Result<(), IdentityError>;

    /// Returns a valid ID token for the current identity, refreshing it when
    /// stale, or `None` when nobody is signed in.
    async fn id_token(&self) -> Result<Option<SecretString>, IdentityError>;

    async fn update_profile(&self, update: &ProfileUpdate) -> Result<Identity, IdentityError>;
}

/// Normalizes emails for stable cache keys and provider requests.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[must_use]
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_email() {
        assert!(valid_email("student@uni.edu"));
        assert!(valid_email("a+b@x.io"));
        assert!(!valid_email("student"));
        assert!(!valid_email("student@uni"));
        assert!(!valid_email("stu dent@uni.edu"));
        assert!(!valid_email(""));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Student@Uni.EDU "), "student@uni.edu");
    }

    #[test]
    fn profile_update_only_touches_given_fields() {
        let mut identity = Identity {
            uid: "u1".to_string(),
            email: "student@uni.edu".to_string(),
            display_name: Some("Ada".to_string()),
            photo_url: None,
        };
        let update = ProfileUpdate {
            display_name: None,
            photo_url: Some("https://img.example/ada.png".to_string()),
        };
        assert!(!update.is_empty());
        update.apply_to(&mut identity);
        assert_eq!(identity.display_name.as_deref(), Some("Ada"));
        assert_eq!(
            identity.photo_url.as_deref(),
            Some("https://img.example/ada.png")
        );
        assert!(ProfileUpdate::default().is_empty());
    }
}
