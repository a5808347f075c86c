//! Client helper for the backend's user records.

use crate::api::{ApiClient, ApiError};
use crate::features::users::types::UserProfile;
use secrecy::SecretString;
use serde_json::Value;
use tracing::instrument;

/// Creates or refreshes the caller's profile record. Called after a federated
/// sign-in; a failure here does not undo the sign-in.
///
/// # Errors
/// Returns an `ApiError` when the request fails or the backend rejects it.
#[instrument(skip_all)]
pub async fn upsert_profile(
    api: &ApiClient,
    bearer: &SecretString,
    profile: &UserProfile,
) -> Result<Value, ApiError> {
    api.post_json(&["users", "create-or-update"], profile, Some(bearer))
        .await
}
