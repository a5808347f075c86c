//! The portal's route table and navigation decisions.

mod guard;

pub use guard::{AccessSnapshot, GuardOutcome, LANDING_PATH, LOGIN_PATH, Redirect, RouteGuard};

use crate::roles::Role;
use std::{collections::BTreeMap, fmt};
use tracing::debug;

pub const DASHBOARD_PATH: &str = "/dashboard";

const STAFF: &[Role] = &[Role::Moderator, Role::Admin];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    pub pattern: &'static str,
    pub guard: RouteGuard,
}

impl Route {
    const fn new(pattern: &'static str, guard: RouteGuard) -> Self {
        Self { pattern, guard }
    }

    /// Matches a normalized path, returning `:name` parameters.
    fn matches(&self, path: &str) -> Option<BTreeMap<&'static str, String>> {
        let mut pattern = self.pattern.split('/').filter(|s| !s.is_empty());
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let mut params = BTreeMap::new();
        loop {
            match (pattern.next(), segments.next()) {
                (None, None) => return Some(params),
                (Some(expected), Some(actual)) => {
                    if let Some(name) = expected.strip_prefix(':') {
                        params.insert(name, actual.to_string());
                    } else if expected != actual {
                        return None;
                    }
                }
                _ => return None,
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Navigation {
    Loading,
    Render {
        route: Route,
        params: BTreeMap<&'static str, String>,
    },
    Redirect(Redirect),
    NotFound,
}

impl fmt::Display for Navigation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loading => f.write_str("loading"),
            Self::Render { route, params } => {
                write!(f, "render {}", route.pattern)?;
                for (name, value) in params {
                    write!(f, " {name}={value}")?;
                }
                Ok(())
            }
            Self::Redirect(redirect) => write!(f, "redirect {}", redirect.href()),
            Self::NotFound => f.write_str("not found"),
        }
    }
}

/// Splits a location into its normalized path and the location to carry
/// through a login redirect (path and query, no fragment).
fn split_location(location: &str) -> (String, String) {
    let without_fragment = location.split('#').next().unwrap_or_default();
    let path = without_fragment.split('?').next().unwrap_or_default();
    let trimmed = path.trim_end_matches('/');
    let path = if trimmed.is_empty() {
        LANDING_PATH.to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    };
    let requested = match without_fragment.split_once('?') {
        Some((_, query)) if !query.is_empty() => format!("{path}?{query}"),
        _ => path.clone(),
    };
    (path, requested)
}

/// Where to go after a successful login. Only same-site paths are honored;
/// `//host` and `/\host` are protocol-relative once a browser normalizes them.
#[must_use]
pub fn login_return_target(next: Option<&str>) -> String {
    match next.map(str::trim) {
        Some(next) if next.starts_with('/') && !matches!(next.as_bytes().get(1), Some(b'/' | b'\\')) => {
            next.to_string()
        }
        _ => LANDING_PATH.to_string(),
    }
}

#[derive(Clone, Debug)]
pub struct Router {
    routes: Vec<Route>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        use RouteGuard::{AuthenticatedOnly, Public, RoleEquals, RoleIn};

        let routes = vec![
            Route::new("/", Public),
            Route::new("/all-scholarships", Public),
            Route::new("/scholarship-details/:id", Public),
            Route::new("/login", Public),
            Route::new("/register", Public),
            Route::new("/checkout/:id", AuthenticatedOnly),
            Route::new("/payment/success", AuthenticatedOnly),
            Route::new("/payment/failure", AuthenticatedOnly),
            Route::new(DASHBOARD_PATH, AuthenticatedOnly),
            Route::new("/dashboard/student/profile", RoleEquals(Role::Student)),
            Route::new("/dashboard/student/applications", RoleEquals(Role::Student)),
            Route::new("/dashboard/student/reviews", RoleEquals(Role::Student)),
            Route::new("/dashboard/moderator/profile", RoleIn(STAFF)),
            Route::new("/dashboard/moderator/manage-applications", RoleIn(STAFF)),
            Route::new("/dashboard/moderator/reviews", RoleIn(STAFF)),
            Route::new("/dashboard/admin/profile", RoleEquals(Role::Admin)),
            Route::new("/dashboard/admin/add-scholarship", RoleEquals(Role::Admin)),
            Route::new("/dashboard/admin/manage-scholarships", RoleEquals(Role::Admin)),
            Route::new("/dashboard/admin/update-scholarship/:id", RoleEquals(Role::Admin)),
            Route::new("/dashboard/admin/manage-users", RoleEquals(Role::Admin)),
            Route::new("/dashboard/admin/role-requests", RoleEquals(Role::Admin)),
            Route::new("/dashboard/admin/analytics", RoleEquals(Role::Admin)),
        ];
        Self { routes }
    }

    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    fn lookup(&self, path: &str) -> Option<(&Route, BTreeMap<&'static str, String>)> {
        self.routes
            .iter()
            .find_map(|route| route.matches(path).map(|params| (route, params)))
    }

    #[must_use]
    pub fn find(&self, location: &str) -> Option<(&Route, BTreeMap<&'static str, String>)> {
        self.lookup(&split_location(location).0)
    }

    /// Resolves `location` against the table and the current access state.
    #[must_use]
    pub fn navigate(&self, location: &str, access: &AccessSnapshot) -> Navigation {
        let (path, requested) = split_location(location);
        let Some((route, params)) = self.lookup(&path) else {
            debug!(path = %path, "no route matched");
            return Navigation::NotFound;
        };

        match route.guard.evaluate(access, &requested) {
            GuardOutcome::Loading => Navigation::Loading,
            GuardOutcome::Redirect(redirect) => Navigation::Redirect(redirect),
            GuardOutcome::Render if route.pattern == DASHBOARD_PATH => {
                match access.authoritative_role() {
                    Some(role) => Navigation::Redirect(Redirect::replace_with(role.dashboard_home())),
                    None => Navigation::Loading,
                }
            }
            GuardOutcome::Render => Navigation::Render {
                route: route.clone(),
                params,
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::identity::Identity;
    use crate::roles::RoleState;
    use crate::session::{Session, SessionStatus};

    fn access(role: Option<Role>) -> AccessSnapshot {
        match role {
            Some(role) => AccessSnapshot::new(
                Session {
                    status: SessionStatus::Authenticated,
                    identity: Some(Identity {
                        uid: "u1".to_string(),
                        email: "ada@uni.edu".to_string(),
                        display_name: None,
                        photo_url: None,
                    }),
                    token: None,
                },
                RoleState::settled("ada@uni.edu", role),
            ),
            None => AccessSnapshot::new(
                Session {
                    status: SessionStatus::Anonymous,
                    ..Session::default()
                },
                RoleState::default(),
            ),
        }
    }

    #[test]
    fn split_location_normalizes() {
        assert_eq!(
            split_location("/dashboard/admin/profile/?tab=1#top"),
            (
                "/dashboard/admin/profile".to_string(),
                "/dashboard/admin/profile?tab=1".to_string()
            )
        );
        assert_eq!(split_location(""), ("/".to_string(), "/".to_string()));
        assert_eq!(
            split_location("login"),
            ("/login".to_string(), "/login".to_string())
        );
    }

    #[test]
    fn find_extracts_params() {
        let router = Router::new();
        let (route, params) = router.find("/scholarship-details/42?ref=home").unwrap();
        assert_eq!(route.pattern, "/scholarship-details/:id");
        assert_eq!(params.get("id").map(String::as_str), Some("42"));

        assert!(router.find("/scholarship-details").is_none());
        assert!(router.find("/scholarship-details/42/extra").is_none());
    }

    #[test]
    fn unknown_paths_are_not_found() {
        let router = Router::new();
        assert_eq!(
            router.navigate("/nowhere", &access(Some(Role::Admin))),
            Navigation::NotFound
        );
        assert_eq!(
            router.navigate("/dashboard/admin", &access(None)),
            Navigation::NotFound
        );
    }

    #[test]
    fn public_routes_render_for_anyone() {
        let router = Router::new();
        assert!(matches!(
            router.navigate("/all-scholarships", &access(None)),
            Navigation::Render { .. }
        ));
        assert!(matches!(
            router.navigate("/", &AccessSnapshot::default()),
            Navigation::Render { .. }
        ));
    }

    #[test]
    fn dashboard_index_redirects_to_role_home() {
        let router = Router::new();
        for role in Role::ALL {
            assert_eq!(
                router.navigate("/dashboard/", &access(Some(role))),
                Navigation::Redirect(Redirect::replace_with(role.dashboard_home()))
            );
        }
    }

    #[test]
    fn moderator_routes_admit_admins() {
        let router = Router::new();
        assert!(matches!(
            router.navigate("/dashboard/moderator/manage-applications", &access(Some(Role::Admin))),
            Navigation::Render { .. }
        ));
        assert_eq!(
            router.navigate("/dashboard/admin/manage-users", &access(Some(Role::Moderator))),
            Navigation::Redirect(Redirect::to_landing())
        );
    }

    #[test]
    fn anonymous_dashboard_goes_to_login() {
        let router = Router::new();
        assert_eq!(
            router.navigate("/dashboard/admin/update-scholarship/7", &access(None)),
            Navigation::Redirect(Redirect::to_login("/dashboard/admin/update-scholarship/7"))
        );
    }

    #[test]
    fn navigation_display() {
        let router = Router::new();
        assert_eq!(
            router
                .navigate("/scholarship-details/42", &access(None))
                .to_string(),
            "render /scholarship-details/:id id=42"
        );
        assert_eq!(
            router.navigate("/checkout/9", &access(None)).to_string(),
            "redirect /login?next=%2Fcheckout%2F9"
        );
        assert_eq!(Navigation::Loading.to_string(), "loading");
        assert_eq!(Navigation::NotFound.to_string(), "not found");
    }

    #[test]
    fn return_target_only_allows_local_paths() {
        assert_eq!(login_return_target(Some("/checkout/9")), "/checkout/9");
        assert_eq!(login_return_target(Some("//evil.example")), "/");
        assert_eq!(login_return_target(Some("/\\evil.example")), "/");
        assert_eq!(login_return_target(Some("/\\/evil.example")), "/");
        assert_eq!(login_return_target(Some("/")), "/");
        assert_eq!(login_return_target(Some("https://evil.example")), "/");
        assert_eq!(login_return_target(None), "/");
    }
}
