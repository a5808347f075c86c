//! Client helper for role-elevation requests. Approval happens out of band, so
//! callers refresh the role resolver once an admin has acted.

use crate::api::{ApiClient, ApiError};
use crate::features::role_requests::types::RoleRequest;
use crate::roles::Role;
use secrecy::SecretString;
use serde_json::Value;
use tracing::instrument;

/// Submits a request for a higher role after basic input validation.
///
/// # Errors
/// Returns `ApiError::Config` when asking for the `Student` role, otherwise an
/// `ApiError` from the request.
#[instrument(skip_all, fields(requested_role = %request.requested_role))]
pub async fn submit_role_request(
    api: &ApiClient,
    bearer: &SecretString,
    request: &RoleRequest,
) -> Result<Value, ApiError> {
    if request.requested_role == Role::Student {
        return Err(ApiError::Config(
            "Only Moderator or Admin can be requested.".to_string(),
        ));
    }

    let request = RoleRequest {
        requested_role: request.requested_role,
        message: request.message.trim().to_string(),
    };
    api.post_json(&["role-requests", "create"], &request, Some(bearer))
        .await
}
