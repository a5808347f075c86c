//! The portal context: one owned value wiring the session manager, role
//! resolver, router and backend client. Views and commands receive a
//! `&Portal` instead of reaching for globals.

use crate::api::{ApiClient, ApiError};
use crate::config::{DEFAULT_REQUEST_TIMEOUT, PortalConfig};
use crate::features::role_requests::{RoleRequest, submit_role_request};
use crate::features::users::{UserProfile, upsert_profile};
use crate::identity::{Identity, IdentityError, IdentityProvider, PopupFlow, firebase::FirebaseProvider};
use crate::roles::{HttpRoleSource, Role, RoleResolver, RoleSource};
use crate::routes::{AccessSnapshot, Navigation, Router};
use crate::session::{SessionManager, Subscription};
use secrecy::SecretString;
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};

/// Result of a federated sign-in. The profile upsert runs after the sign-in
/// and its failure does not undo it.
#[derive(Debug)]
pub struct FederatedSignIn {
    pub identity: Identity,
    pub profile_sync: Result<(), ApiError>,
}

pub struct Portal {
    session: SessionManager,
    roles: Arc<RoleResolver>,
    router: Router,
    api: ApiClient,
    settle_timeout: Duration,
    _role_tracker: Subscription,
}

impl Portal {
    /// Starts the session manager and the role tracker. Must be called within
    /// a tokio runtime.
    #[must_use]
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        role_source: Arc<dyn RoleSource>,
        api: ApiClient,
        role_cache_ttl: Duration,
    ) -> Self {
        let session = SessionManager::start(provider);
        let roles = Arc::new(RoleResolver::new(role_source, role_cache_ttl));
        let role_tracker = roles.attach(session.subscribe());

        Self {
            session,
            roles,
            router: Router::new(),
            api,
            settle_timeout: DEFAULT_REQUEST_TIMEOUT * 2,
            _role_tracker: role_tracker,
        }
    }

    /// Production wiring: Firebase identity and the backend role endpoint.
    ///
    /// # Errors
    /// Returns `ApiError::Config` when a base URL is invalid or the HTTP client
    /// cannot be built.
    pub fn from_config(
        config: &PortalConfig,
        popup: Option<Arc<dyn PopupFlow>>,
    ) -> Result<Self, ApiError> {
        let mut provider = FirebaseProvider::new(config)?;
        if let Some(popup) = popup {
            provider = provider.with_popup(popup);
        }
        let api = ApiClient::from_config(config)?;
        let role_source = HttpRoleSource::new(api.clone());

        Ok(Self::new(
            Arc::new(provider),
            Arc::new(role_source),
            api,
            config.role_cache_ttl,
        )
        .with_settle_timeout(config.request_timeout * 2))
    }

    /// Upper bound for [`Portal::navigate`] to wait on pending state.
    #[must_use]
    pub fn with_settle_timeout(mut self, timeout: Duration) -> Self {
        self.settle_timeout = timeout;
        self
    }

    #[must_use]
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    #[must_use]
    pub fn roles(&self) -> &RoleResolver {
        &self.roles
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    #[must_use]
    pub fn access(&self) -> AccessSnapshot {
        AccessSnapshot::new(self.session.snapshot(), self.roles.current())
    }

    /// Waits until neither the session nor the role is pending, or the settle
    /// timeout passes, and returns the latest view.
    pub async fn settled_access(&self) -> AccessSnapshot {
        let mut sessions = self.session.subscribe();
        let mut roles = self.roles.subscribe();
        let wait = async {
            loop {
                let access = AccessSnapshot::new(
                    sessions.borrow_and_update().clone(),
                    roles.borrow_and_update().clone(),
                );
                if !access.is_loading() {
                    return access;
                }
                tokio::select! {
                    changed = sessions.changed() => if changed.is_err() { return access; },
                    changed = roles.changed() => if changed.is_err() { return access; },
                }
            }
        };

        match tokio::time::timeout(self.settle_timeout, wait).await {
            Ok(access) => access,
            Err(_) => {
                warn!(timeout = ?self.settle_timeout, "session or role still pending");
                self.access()
            }
        }
    }

    /// Decides navigation from the current state, possibly `Loading`.
    #[must_use]
    pub fn navigate_now(&self, location: &str) -> Navigation {
        self.router.navigate(location, &self.access())
    }

    /// Decides navigation once the state has settled.
    pub async fn navigate(&self, location: &str) -> Navigation {
        let access = self.settled_access().await;
        self.router.navigate(location, &access)
    }

    /// Signs in through the popup flow, then records the profile on the
    /// backend.
    ///
    /// # Errors
    /// Returns the sign-in's `IdentityError`. Profile failures are reported in
    /// [`FederatedSignIn::profile_sync`].
    pub async fn sign_in_with_federated_provider(&self) -> Result<FederatedSignIn, IdentityError> {
        let identity = self.session.sign_in_with_federated_provider().await?;

        let profile_sync = match self.session.bearer_token().await {
            Some(token) => upsert_profile(&self.api, &token, &UserProfile::from_identity(&identity))
                .await
                .map(|_| ()),
            None => Err(ApiError::Config(
                "Failed to get authentication token.".to_string(),
            )),
        };
        match &profile_sync {
            Ok(()) => info!(uid = %identity.uid, "profile saved"),
            Err(err) => warn!(error = %err, "failed to save profile after sign-in"),
        }

        Ok(FederatedSignIn {
            identity,
            profile_sync,
        })
    }

    /// Clears the session and resets the role to an untracked `Student` before
    /// returning. A role lookup still in flight is discarded.
    pub async fn sign_out(&self) {
        self.session.sign_out().await;
        self.roles.track(None).await;
    }

    async fn require_token(&self) -> Result<SecretString, ApiError> {
        self.session
            .bearer_token()
            .await
            .ok_or_else(|| ApiError::Config("You must be signed in.".to_string()))
    }

    /// Asks an admin for a higher role.
    ///
    /// # Errors
    /// Returns `ApiError::Config` without a signed-in identity, otherwise the
    /// request's `ApiError`.
    pub async fn request_role(&self, requested_role: Role, message: &str) -> Result<Value, ApiError> {
        let token = self.require_token().await?;
        let request = RoleRequest {
            requested_role,
            message: message.to_string(),
        };
        submit_role_request(&self.api, &token, &request).await
    }

    /// Bearer token for backend calls made outside the portal's own helpers.
    ///
    /// # Errors
    /// Returns `ApiError::Config` without a signed-in identity.
    pub async fn bearer(&self) -> Result<SecretString, ApiError> {
        self.require_token().await
    }

    /// Re-resolves the signed-in identity's role, bypassing the cache. Used
    /// once a role request has been approved.
    pub async fn refresh_role(&self) -> Role {
        let session = self.session.snapshot();
        match session.email() {
            Some(email) => self.roles.refresh(email).await,
            None => Role::Student,
        }
    }
}
