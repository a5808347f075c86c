//! Route guards. Guards are UX only; the backend enforces access on every call.

use crate::roles::{Capabilities, Role, RoleState};
use crate::session::Session;
use std::fmt;
use url::form_urlencoded;

pub const LOGIN_PATH: &str = "/login";
pub const LANDING_PATH: &str = "/";

/// Session and role state as one consistent view.
#[derive(Clone, Debug, Default)]
pub struct AccessSnapshot {
    pub session: Session,
    pub role: RoleState,
}

impl AccessSnapshot {
    #[must_use]
    pub fn new(session: Session, role: RoleState) -> Self {
        Self { session, role }
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.session.is_loading() || (self.session.is_authenticated() && self.role_pending())
    }

    fn role_pending(&self) -> bool {
        self.role.loading || self.role.email.as_deref() != self.session.email()
    }

    /// The role, but only once the session has settled and the role state
    /// belongs to the signed-in identity.
    #[must_use]
    pub fn authoritative_role(&self) -> Option<Role> {
        if !self.session.is_authenticated() || self.session.is_loading() || self.role_pending() {
            return None;
        }
        Some(self.role.role)
    }

    #[must_use]
    pub fn capabilities(&self) -> Option<Capabilities> {
        self.authoritative_role().map(Role::capabilities)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Redirect {
    pub to: String,
    /// Location to come back to after signing in.
    pub return_to: Option<String>,
    /// Replace the current history entry instead of pushing one.
    pub replace: bool,
}

impl Redirect {
    #[must_use]
    pub fn to_login(requested: &str) -> Self {
        Self {
            to: LOGIN_PATH.to_string(),
            return_to: Some(requested.to_string()),
            replace: true,
        }
    }

    #[must_use]
    pub fn to_landing() -> Self {
        Self::replace_with(LANDING_PATH)
    }

    #[must_use]
    pub fn replace_with(to: &str) -> Self {
        Self {
            to: to.to_string(),
            return_to: None,
            replace: true,
        }
    }

    /// Target as a link, with the return location in `next`.
    #[must_use]
    pub fn href(&self) -> String {
        match &self.return_to {
            Some(next) => {
                let encoded: String = form_urlencoded::byte_serialize(next.as_bytes()).collect();
                format!("{}?next={encoded}", self.to)
            }
            None => self.to.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Nothing may be shown yet, neither content nor a redirect.
    Loading,
    Render,
    Redirect(Redirect),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouteGuard {
    Public,
    AuthenticatedOnly,
    RoleEquals(Role),
    RoleIn(&'static [Role]),
}

impl fmt::Display for RouteGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => f.write_str("public"),
            Self::AuthenticatedOnly => f.write_str("signed in"),
            Self::RoleEquals(role) => write!(f, "role {role}"),
            Self::RoleIn(roles) => {
                let names: Vec<&str> = roles.iter().map(|role| role.as_str()).collect();
                write!(f, "role in {}", names.join(" | "))
            }
        }
    }
}

impl RouteGuard {
    #[must_use]
    pub fn admits(&self, role: Role) -> bool {
        match self {
            Self::Public | Self::AuthenticatedOnly => true,
            Self::RoleEquals(required) => *required == role,
            Self::RoleIn(allowed) => allowed.contains(&role),
        }
    }

    /// Decides what to show for `requested` (path and query).
    #[must_use]
    pub fn evaluate(&self, access: &AccessSnapshot, requested: &str) -> GuardOutcome {
        if *self == Self::Public {
            return GuardOutcome::Render;
        }
        if access.session.is_loading() {
            return GuardOutcome::Loading;
        }
        if !access.session.is_authenticated() {
            return GuardOutcome::Redirect(Redirect::to_login(requested));
        }
        match access.authoritative_role() {
            None => GuardOutcome::Loading,
            Some(role) if self.admits(role) => GuardOutcome::Render,
            Some(_) => GuardOutcome::Redirect(Redirect::to_landing()),
        }
    }
}
