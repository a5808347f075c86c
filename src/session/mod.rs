//! Session state for the portal. The [`SessionManager`] is the single writer of
//! the session: it listens to the identity provider's change stream and wraps
//! the sign-in, registration and sign-out calls. Everyone else subscribes to
//! snapshots through a `watch` channel instead of polling.
//!
//! State machine: `Uninitialized → Loading → {Authenticated | Anonymous}`.
//! Starting the manager and every operation enter `Loading`; a provider
//! notification (or the operation's own result) leaves it. A failed operation
//! falls back to whatever the current identity implies.

mod subscription;

pub use subscription::Subscription;

use crate::identity::{Identity, IdentityError, IdentityProvider, ProfileUpdate};
use secrecy::SecretString;
use std::{future::Future, sync::Arc};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionStatus {
    #[default]
    Uninitialized,
    Loading,
    Authenticated,
    Anonymous,
}

/// Snapshot of the signed-in state. The token is a secret and redacted in
/// `Debug` output.
#[derive(Clone, Debug, Default)]
pub struct Session {
    pub status: SessionStatus,
    pub identity: Option<Identity>,
    pub token: Option<SecretString>,
}

impl Session {
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(
            self.status,
            SessionStatus::Uninitialized | SessionStatus::Loading
        )
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated && self.identity.is_some()
    }

    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.identity.as_ref().map(|identity| identity.email.as_str())
    }
}

struct Shared {
    provider: Arc<dyn IdentityProvider>,
    state: watch::Sender<Session>,
    identities: watch::Receiver<Option<Identity>>,
}

impl Shared {
    fn begin(&self) {
        self.state.send_modify(|session| session.status = SessionStatus::Loading);
    }

    /// Leaves `Loading` after a failed operation.
    fn restore(&self) {
        self.state.send_modify(|session| {
            if session.status == SessionStatus::Loading {
                session.status = if session.identity.is_some() {
                    SessionStatus::Authenticated
                } else {
                    SessionStatus::Anonymous
                };
            }
        });
    }

    fn clear(&self, status: SessionStatus) {
        self.state.send_modify(|session| {
            session.status = status;
            session.identity = None;
            session.token = None;
        });
    }

    fn is_current(&self, identity: Option<&Identity>) -> bool {
        let current = self.identities.borrow();
        match (current.as_ref(), identity) {
            (Some(current), Some(identity)) => current.uid == identity.uid,
            (None, None) => true,
            _ => false,
        }
    }

    async fn fetch_token(&self) -> Option<SecretString> {
        match self.provider.id_token().await {
            Ok(token) => token,
            Err(err) => {
                warn!(error = %err, "failed to fetch id token");
                None
            }
        }
    }

    async fn authenticate(&self, identity: Identity) {
        let token = self.fetch_token().await;
        self.state.send_modify(|session| {
            session.status = SessionStatus::Authenticated;
            session.identity = Some(identity);
            session.token = token;
        });
    }

    /// Applies a provider notification unless a newer one has already been
    /// published.
    async fn settle(&self, identity: Option<Identity>) {
        match identity {
            Some(identity) => {
                let token = self.fetch_token().await;
                if !self.is_current(Some(&identity)) {
                    debug!(uid = %identity.uid, "skipping superseded identity notification");
                    return;
                }
                self.state.send_modify(|session| {
                    session.status = SessionStatus::Authenticated;
                    session.identity = Some(identity);
                    session.token = token;
                });
            }
            None => {
                if self.is_current(None) {
                    self.clear(SessionStatus::Anonymous);
                }
            }
        }
    }
}

async fn listen(shared: Arc<Shared>, mut identities: watch::Receiver<Option<Identity>>) {
    loop {
        let identity = identities.borrow_and_update().clone();
        shared.settle(identity).await;
        if identities.changed().await.is_err() {
            debug!("identity provider closed its change stream");
            break;
        }
    }
}

pub struct SessionManager {
    shared: Arc<Shared>,
    listener: Subscription,
}

impl SessionManager {
    /// Subscribes to the provider and enters `Loading` until its first
    /// notification is applied. Must be called within a tokio runtime.
    #[must_use]
    pub fn start(provider: Arc<dyn IdentityProvider>) -> Self {
        let identities = provider.watch();
        let (state, _) = watch::channel(Session {
            status: SessionStatus::Loading,
            ..Session::default()
        });
        let shared = Arc::new(Shared {
            provider,
            state,
            identities: identities.clone(),
        });
        let handle = tokio::spawn(listen(shared.clone(), identities));

        Self {
            shared,
            listener: Subscription::new("identity-changes", handle),
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.shared.state.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.shared.state.borrow().clone()
    }

    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.listener.is_active()
    }

    /// Waits until the session leaves `Uninitialized`/`Loading`.
    pub async fn settled(&self) -> Session {
        let mut sessions = self.subscribe();
        match sessions.wait_for(|session| !session.is_loading()).await {
            Ok(session) => session.clone(),
            Err(_) => self.snapshot(),
        }
    }

    async fn run<F>(&self, operation: F) -> Result<Identity, IdentityError>
    where
        F: Future<Output = Result<Identity, IdentityError>>,
    {
        self.shared.begin();
        match operation.await {
            Ok(identity) => {
                info!(uid = %identity.uid, "signed in");
                self.shared.authenticate(identity.clone()).await;
                Ok(identity)
            }
            Err(err) => {
                debug!(error = %err, "identity operation failed");
                self.shared.restore();
                Err(err)
            }
        }
    }

    /// Creates an account and signs it in.
    ///
    /// # Errors
    /// `EmailInUse`, `WeakPassword`, `InvalidEmail` or `Unknown` from the provider.
    #[instrument(skip_all)]
    pub async fn register_with_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Identity, IdentityError> {
        self.run(self.shared.provider.create_user(email, password))
            .await
    }

    /// # Errors
    /// `NotFound`, `WrongPassword` or `Unknown` from the provider.
    #[instrument(skip_all)]
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Identity, IdentityError> {
        self.run(self.shared.provider.sign_in_with_password(email, password))
            .await
    }

    /// Runs the provider-hosted popup flow.
    ///
    /// # Errors
    /// `PopupClosed` or `Unknown` from the provider.
    #[instrument(skip_all)]
    pub async fn sign_in_with_federated_provider(&self) -> Result<Identity, IdentityError> {
        self.run(self.shared.provider.sign_in_with_popup()).await
    }

    /// Clears the local session. A failing remote sign-out is logged and
    /// otherwise ignored.
    #[instrument(skip_all)]
    pub async fn sign_out(&self) {
        self.shared.clear(SessionStatus::Loading);
        if let Err(err) = self.shared.provider.sign_out().await {
            warn!(error = %err, "remote sign-out failed, local session cleared anyway");
        }
        self.shared.clear(SessionStatus::Anonymous);
        info!("signed out");
    }

    /// Returns a valid bearer token, refreshing a stale one through the
    /// provider, or `None` without an identity.
    pub async fn bearer_token(&self) -> Option<SecretString> {
        let signed_in = self.shared.state.borrow().identity.is_some();
        if !signed_in {
            return None;
        }

        match self.shared.provider.id_token().await {
            Ok(token) => {
                self.shared.state.send_modify(|session| {
                    if session.identity.is_some() {
                        session.token.clone_from(&token);
                    }
                });
                token
            }
            Err(err) => {
                warn!(error = %err, "failed to fetch bearer token");
                None
            }
        }
    }

    /// Changes display name and/or photo on the provider and in the local
    /// session. The role is not affected.
    ///
    /// # Errors
    /// `NotSignedIn` without an identity, otherwise the provider's error.
    #[instrument(skip_all)]
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Identity, IdentityError> {
        let signed_in = self.shared.state.borrow().identity.is_some();
        if !signed_in {
            return Err(IdentityError::NotSignedIn);
        }

        let identity = self.shared.provider.update_profile(update).await?;
        self.shared.state.send_modify(|session| {
            if let Some(current) = session.identity.as_mut() {
                if current.uid == identity.uid {
                    *current = identity.clone();
                }
            }
        });
        Ok(identity)
    }
}
