use crate::roles::Role;
use serde::{Deserialize, Serialize};

/// Request to be promoted, reviewed by an admin on the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRequest {
    pub requested_role: Role,
    pub message: String,
}
