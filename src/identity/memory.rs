//! In-process identity provider with the same contract as Firebase. Used by
//! tests and offline runs; accounts live in memory and tokens are opaque
//! counters. Failure switches let callers simulate network loss and a failing
//! remote sign-out.

use super::{Identity, IdentityError, IdentityProvider, ProfileUpdate, normalize_email, valid_email};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::sync::{
    Mutex, PoisonError,
    atomic::{AtomicBool, AtomicU64, Ordering},
};
use tokio::sync::watch;

/// Firebase rejects passwords shorter than this.
pub const MIN_PASSWORD_LEN: usize = 6;

struct Account {
    identity: Identity,
    password: SecretString,
}

struct Signed {
    uid: String,
    token: SecretString,
    stale: bool,
}

#[derive(Default)]
struct Store {
    accounts: HashMap<String, Account>,
    signed: Option<Signed>,
    popup: Option<Identity>,
}

pub struct InMemoryProvider {
    store: Mutex<Store>,
    changes: watch::Sender<Option<Identity>>,
    next_uid: AtomicU64,
    tokens_issued: AtomicU64,
    offline: AtomicBool,
    fail_sign_out: AtomicBool,
}

impl Default for InMemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryProvider {
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = watch::channel(None);
        Self {
            store: Mutex::new(Store::default()),
            changes,
            next_uid: AtomicU64::new(1),
            tokens_issued: AtomicU64::new(0),
            offline: AtomicBool::new(false),
            fail_sign_out: AtomicBool::new(false),
        }
    }

    /// Seeds an account without signing it in.
    #[must_use]
    pub fn with_account(self, email: &str, password: &str, display_name: Option<&str>) -> Self {
        let identity = Identity {
            uid: self.mint_uid(),
            email: normalize_email(email),
            display_name: display_name.map(ToString::to_string),
            photo_url: None,
        };
        self.lock().accounts.insert(
            identity.email.clone(),
            Account {
                identity,
                password: SecretString::from(password.to_string()),
            },
        );
        self
    }

    /// Identity the next popup sign-in returns; `None` simulates a closed popup.
    pub fn set_popup_identity(&self, identity: Option<Identity>) {
        self.lock().popup = identity;
    }

    /// While offline every remote call fails with `Unknown`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Makes `sign_out` report a failure after clearing local state.
    pub fn set_fail_sign_out(&self, fail: bool) {
        self.fail_sign_out.store(fail, Ordering::SeqCst);
    }

    /// Marks the current token stale so the next `id_token` mints a new one.
    pub fn expire_token(&self) {
        if let Some(signed) = self.lock().signed.as_mut() {
            signed.stale = true;
        }
    }

    /// Number of tokens minted so far, refreshes included.
    #[must_use]
    pub fn tokens_issued(&self) -> u64 {
        self.tokens_issued.load(Ordering::SeqCst)
    }

    /// Live receivers of the change stream.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.changes.receiver_count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn mint_uid(&self) -> String {
        format!("mem-{}", self.next_uid.fetch_add(1, Ordering::SeqCst))
    }

    fn mint_token(&self, uid: &str) -> SecretString {
        let n = self.tokens_issued.fetch_add(1, Ordering::SeqCst) + 1;
        SecretString::from(format!("memory-token-{uid}-{n}"))
    }

    fn ensure_online(&self) -> Result<(), IdentityError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(IdentityError::Unknown("network unreachable".to_string()))
        } else {
            Ok(())
        }
    }

    fn sign_in_as(&self, store: &mut Store, identity: &Identity) {
        store.signed = Some(Signed {
            uid: identity.uid.clone(),
            token: self.mint_token(&identity.uid),
            stale: false,
        });
        self.changes.send_replace(Some(identity.clone()));
    }
}

#[async_trait]
impl IdentityProvider for InMemoryProvider {
    fn watch(&self) -> watch::Receiver<Option<Identity>> {
        self.changes.subscribe()
    }

    async fn create_user(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Identity, IdentityError> {
        self.ensure_online()?;
        let email = normalize_email(email);
        if !valid_email(&email) {
            return Err(IdentityError::InvalidEmail);
        }
        if password.expose_secret().chars().count() < MIN_PASSWORD_LEN {
            return Err(IdentityError::WeakPassword);
        }

        let mut store = self.lock();
        if store.accounts.contains_key(&email) {
            return Err(IdentityError::EmailInUse);
        }

        let identity = Identity {
            uid: self.mint_uid(),
            email: email.clone(),
            display_name: None,
            photo_url: None,
        };
        store.accounts.insert(
            email,
            Account {
                identity: identity.clone(),
                password: password.clone(),
            },
        );
        self.sign_in_as(&mut store, &identity);
        Ok(identity)
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Identity, IdentityError> {
        self.ensure_online()?;
        let email = normalize_email(email);

        let mut store = self.lock();
        let identity = match store.accounts.get(&email) {
            None => return Err(IdentityError::NotFound),
            Some(account) if account.password.expose_secret() != password.expose_secret() => {
                return Err(IdentityError::WrongPassword);
            }
            Some(account) => account.identity.clone(),
        };
        self.sign_in_as(&mut store, &identity);
        Ok(identity)
    }

    async fn sign_in_with_popup(&self) -> Result<Identity, IdentityError> {
        self.ensure_online()?;
        let mut store = self.lock();
        let identity = store.popup.clone().ok_or(IdentityError::PopupClosed)?;
        store
            .accounts
            .entry(identity.email.clone())
            .or_insert_with(|| Account {
                identity: identity.clone(),
                password: SecretString::default(),
            });
        self.sign_in_as(&mut store, &identity);
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        self.lock().signed = None;
        self.changes.send_replace(None);
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(IdentityError::Unknown("revoke failed".to_string()));
        }
        Ok(())
    }

    async fn id_token(&self) -> Result<Option<SecretString>, IdentityError> {
        let mut store = self.lock();
        let Some(signed) = store.signed.as_mut() else {
            return Ok(None);
        };
        if signed.stale {
            self.ensure_online()?;
            let uid = signed.uid.clone();
            signed.token = self.mint_token(&uid);
            signed.stale = false;
        }
        Ok(Some(signed.token.clone()))
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> Result<Identity, IdentityError> {
        self.ensure_online()?;
        let mut store = self.lock();
        let Some(uid) = store.signed.as_ref().map(|signed| signed.uid.clone()) else {
            return Err(IdentityError::NotSignedIn);
        };
        let Some(account) = store
            .accounts
            .values_mut()
            .find(|account| account.identity.uid == uid)
        else {
            return Err(IdentityError::NotFound);
        };
        update.apply_to(&mut account.identity);
        let identity = account.identity.clone();
        drop(store);

        self.changes.send_replace(Some(identity.clone()));
        Ok(identity)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    #[tokio::test]
    async fn create_user_validates_input() {
        let provider = InMemoryProvider::new().with_account("taken@uni.edu", "hunter22", None);

        assert_eq!(
            provider.create_user("not-an-email", &secret("hunter22")).await,
            Err(IdentityError::InvalidEmail)
        );
        assert_eq!(
            provider.create_user("new@uni.edu", &secret("123")).await,
            Err(IdentityError::WeakPassword)
        );
        assert_eq!(
            provider.create_user("Taken@uni.edu", &secret("hunter22")).await,
            Err(IdentityError::EmailInUse)
        );

        let identity = provider
            .create_user("new@uni.edu", &secret("hunter22"))
            .await
            .unwrap();
        assert_eq!(provider.watch().borrow().as_ref(), Some(&identity));
    }

    #[tokio::test]
    async fn sign_in_classifies_failures() {
        let provider = InMemoryProvider::new().with_account("ada@uni.edu", "hunter22", None);

        assert_eq!(
            provider
                .sign_in_with_password("nobody@uni.edu", &secret("hunter22"))
                .await,
            Err(IdentityError::NotFound)
        );
        assert_eq!(
            provider
                .sign_in_with_password("ada@uni.edu", &secret("nope"))
                .await,
            Err(IdentityError::WrongPassword)
        );

        provider.set_offline(true);
        assert!(matches!(
            provider
                .sign_in_with_password("ada@uni.edu", &secret("hunter22"))
                .await,
            Err(IdentityError::Unknown(_))
        ));
        assert!(provider.watch().borrow().is_none());
    }

    #[tokio::test]
    async fn stale_token_is_reminted() {
        let provider = InMemoryProvider::new().with_account("ada@uni.edu", "hunter22", None);
        provider
            .sign_in_with_password("ada@uni.edu", &secret("hunter22"))
            .await
            .unwrap();

        let first = provider.id_token().await.unwrap().unwrap();
        let again = provider.id_token().await.unwrap().unwrap();
        assert_eq!(first.expose_secret(), again.expose_secret());
        assert_eq!(provider.tokens_issued(), 1);

        provider.expire_token();
        let refreshed = provider.id_token().await.unwrap().unwrap();
        assert_ne!(first.expose_secret(), refreshed.expose_secret());
        assert_eq!(provider.tokens_issued(), 2);
    }

    #[tokio::test]
    async fn popup_closed_without_identity() {
        let provider = InMemoryProvider::new();
        assert_eq!(
            provider.sign_in_with_popup().await,
            Err(IdentityError::PopupClosed)
        );
    }
}
