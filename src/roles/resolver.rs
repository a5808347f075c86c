//! Resolves and caches the caller's role.
//!
//! Lookups never fail from the caller's point of view: any error is logged and
//! degrades to `Student`. Successful lookups are cached per email for the
//! configured window and concurrent lookups of the same email share a single
//! query. Failures are not cached.
//!
//! [`RoleResolver::track`] publishes a [`RoleState`] for the identity currently
//! signed in. Each call takes a new generation number and only the newest
//! generation may publish, so a slow response for a previous email can never
//! overwrite the state of the current one.

use super::Role;
use crate::api::ApiError;
use crate::session::{Session, Subscription};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use thiserror::Error;
use tokio::{sync::Mutex as AsyncMutex, sync::watch, time::Instant};
use tracing::{debug, instrument, warn};

#[derive(Debug, Error)]
pub enum RoleResolutionError {
    #[error("role lookup failed: {0}")]
    Api(#[from] ApiError),
    #[error("role lookup failed: {0}")]
    Source(String),
}

/// Where roles come from. Production uses the backend's role endpoint.
#[async_trait]
pub trait RoleSource: Send + Sync {
    async fn fetch_role(&self, email: &str) -> Result<Role, RoleResolutionError>;
}

/// Role of the tracked identity. `loading` stays set until the lookup for
/// `email` has settled.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoleState {
    pub email: Option<String>,
    pub role: Role,
    pub loading: bool,
}

impl RoleState {
    #[must_use]
    pub fn settled(email: &str, role: Role) -> Self {
        Self {
            email: Some(email.to_string()),
            role,
            loading: false,
        }
    }

    #[must_use]
    pub fn loading(email: &str) -> Self {
        Self {
            email: Some(email.to_string()),
            role: Role::Student,
            loading: true,
        }
    }
}

struct CachedRole {
    role: Role,
    fetched_at: Instant,
}

/// Shared per-email lock. Leaving the map on drop keeps it from leaking when
/// a lookup is cancelled mid-fetch.
struct InflightGate<'a> {
    resolver: &'a RoleResolver,
    email: &'a str,
    gate: Arc<AsyncMutex<()>>,
}

impl Drop for InflightGate<'_> {
    fn drop(&mut self) {
        let mut inflight = self
            .resolver
            .inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // The map holds one reference and this gate the other.
        if Arc::strong_count(&self.gate) <= 2 {
            inflight.remove(self.email);
        }
    }
}

pub struct RoleResolver {
    source: Arc<dyn RoleSource>,
    ttl: Duration,
    cache: Mutex<HashMap<String, CachedRole>>,
    inflight: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    generation: AtomicU64,
    state: watch::Sender<RoleState>,
}

impl RoleResolver {
    #[must_use]
    pub fn new(source: Arc<dyn RoleSource>, ttl: Duration) -> Self {
        let (state, _) = watch::channel(RoleState::default());
        Self {
            source,
            ttl,
            cache: Mutex::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
            state,
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<RoleState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn current(&self) -> RoleState {
        self.state.borrow().clone()
    }

    fn lock_cache(&self) -> MutexGuard<'_, HashMap<String, CachedRole>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cached(&self, email: &str) -> Option<Role> {
        self.lock_cache()
            .get(email)
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| entry.role)
    }

    fn gate<'a>(&'a self, email: &'a str) -> InflightGate<'a> {
        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        let gate = inflight
            .entry(email.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();
        InflightGate {
            resolver: self,
            email,
            gate,
        }
    }

    /// Returns the role for `email`, querying the source at most once per
    /// cache window.
    #[instrument(skip(self))]
    pub async fn resolve_role(&self, email: &str) -> Role {
        if email.trim().is_empty() {
            return Role::Student;
        }
        if let Some(role) = self.cached(email) {
            return role;
        }

        let gate = self.gate(email);
        let _lock = gate.gate.lock().await;
        match self.cached(email) {
            Some(role) => role,
            None => self.fetch(email).await,
        }
    }

    async fn fetch(&self, email: &str) -> Role {
        match self.source.fetch_role(email).await {
            Ok(role) => {
                debug!(%role, "role resolved");
                let mut cache = self.lock_cache();
                cache.retain(|_, entry| entry.fetched_at.elapsed() < self.ttl);
                cache.insert(
                    email.to_string(),
                    CachedRole {
                        role,
                        fetched_at: Instant::now(),
                    },
                );
                role
            }
            Err(err) => {
                warn!(error = %err, "role lookup failed, defaulting to Student");
                Role::Student
            }
        }
    }

    /// Drops the cached entry and queries again. Republishes the state when
    /// `email` is the tracked identity.
    pub async fn refresh(&self, email: &str) -> Role {
        self.lock_cache().remove(email);
        let tracked = self.state.borrow().email.as_deref() == Some(email);
        if tracked {
            self.track(Some(email.to_string())).await
        } else {
            self.resolve_role(email).await
        }
    }

    /// Makes `email` the tracked identity and publishes its role once
    /// resolved. `None` resets the state to an untracked `Student`.
    pub async fn track(&self, email: Option<String>) -> Role {
        let email = email.filter(|email| !email.trim().is_empty());

        let mut generation = 0;
        self.state.send_modify(|state| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *state = match &email {
                Some(email) => RoleState::loading(email),
                None => RoleState::default(),
            };
        });

        let Some(email) = email else {
            return Role::Student;
        };

        let role = self.resolve_role(&email).await;
        let published = self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            *state = RoleState::settled(&email, role);
            true
        });
        if !published {
            debug!(generation, "discarding superseded role lookup");
        }
        role
    }

    /// Follows the session stream and re-tracks whenever the identity email
    /// changes. A lookup still in flight for a previous email is cancelled.
    #[must_use]
    pub fn attach(self: &Arc<Self>, mut sessions: watch::Receiver<Session>) -> Subscription {
        let resolver = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut tracked: Option<Option<String>> = None;
            let mut inflight: Option<Subscription> = None;
            loop {
                let email = sessions
                    .borrow_and_update()
                    .email()
                    .map(ToString::to_string);
                if tracked.as_ref() != Some(&email) {
                    tracked = Some(email.clone());
                    let resolver = Arc::clone(&resolver);
                    let lookup = Subscription::new(
                        "role-lookup",
                        tokio::spawn(async move {
                            resolver.track(email).await;
                        }),
                    );
                    if let Some(mut previous) = inflight.replace(lookup) {
                        previous.dispose();
                    }
                }
                if sessions.changed().await.is_err() {
                    debug!("session stream closed");
                    break;
                }
            }
        });
        Subscription::new("role-tracker", handle)
    }
}
