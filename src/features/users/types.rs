use crate::identity::Identity;
use serde::{Deserialize, Serialize};

/// Profile record the backend keeps for every signed-in user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub email: String,
    pub name: String,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    pub firebase_uid: String,
}

impl UserProfile {
    /// Users without a display name are stored as "User".
    #[must_use]
    pub fn from_identity(identity: &Identity) -> Self {
        Self {
            email: identity.email.clone(),
            name: identity
                .display_name
                .clone()
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| "User".to_string()),
            photo_url: identity.photo_url.clone(),
            firebase_uid: identity.uid.clone(),
        }
    }
}
