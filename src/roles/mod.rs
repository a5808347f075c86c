//! Portal roles and the capabilities each one grants.
//!
//! Authorization is enforced by the backend; the client only uses the role to
//! pick navigation and hide views the caller cannot use.

pub mod http;
pub mod resolver;

pub use http::HttpRoleSource;
pub use resolver::{RoleResolutionError, RoleResolver, RoleSource, RoleState};

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[default]
    Student,
    Moderator,
    Admin,
}

impl Role {
    pub const ALL: [Self; 3] = [Self::Student, Self::Moderator, Self::Admin];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Student => "Student",
            Self::Moderator => "Moderator",
            Self::Admin => "Admin",
        }
    }

    /// Parses the wire form. Unknown values degrade to `Student`.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "Student" => Self::Student,
            "Moderator" => Self::Moderator,
            "Admin" => Self::Admin,
            other => {
                warn!(role = other, "unknown role, treating as Student");
                Self::Student
            }
        }
    }

    /// Landing page of the role's dashboard.
    #[must_use]
    pub fn dashboard_home(self) -> &'static str {
        match self {
            Self::Student => "/dashboard/student/profile",
            Self::Moderator => "/dashboard/moderator/profile",
            Self::Admin => "/dashboard/admin/profile",
        }
    }

    #[must_use]
    pub fn capabilities(self) -> Capabilities {
        match self {
            Self::Student => Capabilities {
                apply_and_review: true,
                ..Capabilities::default()
            },
            Self::Moderator => Capabilities {
                manage_applications: true,
                moderate_reviews: true,
                ..Capabilities::default()
            },
            Self::Admin => Capabilities {
                manage_applications: true,
                moderate_reviews: true,
                manage_scholarships: true,
                manage_users: true,
                view_analytics: true,
                manage_role_requests: true,
                ..Capabilities::default()
            },
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a view may offer, resolved from the role.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub apply_and_review: bool,
    pub manage_applications: bool,
    pub moderate_reviews: bool,
    pub manage_scholarships: bool,
    pub manage_users: bool,
    pub view_analytics: bool,
    pub manage_role_requests: bool,
}
