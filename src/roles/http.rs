use super::{Role, RoleResolutionError, RoleSource};
use crate::api::ApiClient;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;

#[derive(Debug, Deserialize)]
struct RoleResponse {
    #[serde(default)]
    role: Option<String>,
}

/// Reads roles from `GET /users/{email}/role`.
#[derive(Clone, Debug)]
pub struct HttpRoleSource {
    api: ApiClient,
}

impl HttpRoleSource {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl RoleSource for HttpRoleSource {
    #[instrument(skip(self))]
    async fn fetch_role(&self, email: &str) -> Result<Role, RoleResolutionError> {
        let response: RoleResponse = self.api.get_json(&["users", email, "role"], None).await?;
        // A user without a role record gets `{"role": null}` or no field at all.
        Ok(response.role.as_deref().map_or(Role::Student, Role::parse))
    }
}
