//! Firebase Authentication over its REST surface (Identity Toolkit for
//! accounts, Secure Token for refresh). Credentials live in memory only and the
//! refresh token never leaves this module.

use super::{
    FederatedCredential, Identity, IdentityError, IdentityProvider, PopupFlow, ProfileUpdate,
};
use crate::{api::http_client, config::PortalConfig};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::sync::Arc;
use tokio::{
    sync::{Mutex, watch},
    time::{Duration, Instant},
};
use tracing::{Instrument, debug, info_span, instrument, warn};
use url::form_urlencoded;

/// Tokens are treated as stale this long before the provider's expiry.
pub const TOKEN_REFRESH_BUFFER: Duration = Duration::from_secs(30);
/// Lifetime assumed when the provider omits `expiresIn`.
const DEFAULT_TOKEN_LIFETIME_SECONDS: u64 = 3600;
/// Redirect URI reported to `signInWithIdp`; the credential is already in hand.
const IDP_REQUEST_URI: &str = "http://localhost";

struct Credentials {
    identity: Identity,
    id_token: SecretString,
    refresh_token: SecretString,
    expires_at: Instant,
}

impl Credentials {
    fn is_stale(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IdpRequest<'a> {
    post_body: &'a str,
    request_uri: &'a str,
    return_secure_token: bool,
    return_idp_credential: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    id_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    photo_url: Option<&'a str>,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
    id_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct FirebaseProvider {
    client: Client,
    identity_base_url: String,
    token_base_url: String,
    api_key: SecretString,
    popup: Option<Arc<dyn PopupFlow>>,
    credentials: Mutex<Option<Credentials>>,
    changes: watch::Sender<Option<Identity>>,
}

impl FirebaseProvider {
    /// Builds a provider against the configured Identity Toolkit and Secure
    /// Token endpoints.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(config: &PortalConfig) -> Result<Self, crate::api::ApiError> {
        let (changes, _) = watch::channel(None);
        Ok(Self {
            client: http_client(config.request_timeout)?,
            identity_base_url: config.identity_base_url.clone(),
            token_base_url: config.token_base_url.clone(),
            api_key: config.firebase_api_key.clone(),
            popup: None,
            credentials: Mutex::new(None),
            changes,
        })
    }

    /// Enables federated sign-in through the given popup flow.
    #[must_use]
    pub fn with_popup(mut self, popup: Arc<dyn PopupFlow>) -> Self {
        self.popup = Some(popup);
        self
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, IdentityError> {
        let span = info_span!("firebase.request", http.method = "POST", url = %url);
        let response = self
            .client
            .post(url)
            .query(&[("key", self.api_key.expose_secret())])
            .json(body)
            .send()
            .instrument(span)
            .await
            .map_err(|err| IdentityError::Unknown(format!("network error: {err}")))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| IdentityError::Unknown(format!("network error: {err}")))?;

        if status.is_success() {
            serde_json::from_slice(&bytes)
                .map_err(|err| IdentityError::Unknown(format!("malformed response: {err}")))
        } else {
            let message = serde_json::from_slice::<ErrorEnvelope>(&bytes)
                .map(|envelope| envelope.error.message)
                .unwrap_or_else(|_| format!("HTTP {}", status.as_u16()));
            debug!(status = status.as_u16(), "identity provider rejected request");
            Err(classify_error(&message))
        }
    }

    async fn accounts<B: Serialize + ?Sized>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<AccountResponse, IdentityError> {
        let url = format!("{}/accounts:{method}", self.identity_base_url);
        self.post(&url, body).await
    }

    /// Stores fresh credentials from an account response and publishes the
    /// identity.
    async fn establish(&self, response: AccountResponse) -> Result<Identity, IdentityError> {
        let (Some(id_token), Some(refresh_token)) = (response.id_token, response.refresh_token)
        else {
            return Err(IdentityError::Unknown(
                "provider response is missing tokens".to_string(),
            ));
        };
        let Some(email) = response.email else {
            return Err(IdentityError::Unknown(
                "provider response is missing the email".to_string(),
            ));
        };

        let identity = Identity {
            uid: response.local_id,
            email,
            display_name: response.display_name.filter(|name| !name.is_empty()),
            photo_url: response.photo_url.filter(|url| !url.is_empty()),
        };

        let credentials = Credentials {
            identity: identity.clone(),
            id_token: SecretString::from(id_token),
            refresh_token: SecretString::from(refresh_token),
            expires_at: expiry_from(response.expires_in.as_deref()),
        };

        *self.credentials.lock().await = Some(credentials);
        self.changes.send_replace(Some(identity.clone()));
        debug!(uid = %identity.uid, "identity established");

        Ok(identity)
    }

    /// Exchanges the refresh token for a new ID token.
    async fn refresh(&self, credentials: &mut Credentials) -> Result<(), IdentityError> {
        let url = format!("{}/token", self.token_base_url);
        let span = info_span!("firebase.refresh", http.method = "POST", url = %url);
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.expose_secret())])
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", credentials.refresh_token.expose_secret()),
            ])
            .send()
            .instrument(span)
            .await
            .map_err(|err| IdentityError::Unknown(format!("network error: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|envelope| envelope.error.message)
                .unwrap_or_else(|_| format!("HTTP {}", status.as_u16()));
            return Err(IdentityError::Unknown(message));
        }

        let refreshed: RefreshResponse = response
            .json()
            .await
            .map_err(|err| IdentityError::Unknown(format!("malformed response: {err}")))?;

        credentials.id_token = SecretString::from(refreshed.id_token);
        credentials.refresh_token = SecretString::from(refreshed.refresh_token);
        credentials.expires_at = expiry_from(Some(&refreshed.expires_in));
        debug!(uid = %credentials.identity.uid, "id token refreshed");

        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for FirebaseProvider {
    fn watch(&self) -> watch::Receiver<Option<Identity>> {
        self.changes.subscribe()
    }

    #[instrument(skip_all)]
    async fn create_user(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Identity, IdentityError> {
        let request = PasswordRequest {
            email,
            password: password.expose_secret(),
            return_secure_token: true,
        };
        let response = self.accounts("signUp", &request).await?;
        self.establish(response).await
    }

    #[instrument(skip_all)]
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Identity, IdentityError> {
        let request = PasswordRequest {
            email,
            password: password.expose_secret(),
            return_secure_token: true,
        };
        let response = self.accounts("signInWithPassword", &request).await?;
        self.establish(response).await
    }

    #[instrument(skip_all)]
    async fn sign_in_with_popup(&self) -> Result<Identity, IdentityError> {
        let Some(popup) = &self.popup else {
            return Err(IdentityError::Unknown(
                "no federated sign-in flow configured".to_string(),
            ));
        };
        let credential = popup.open().await.ok_or(IdentityError::PopupClosed)?;

        let post_body = idp_post_body(&credential);
        let request = IdpRequest {
            post_body: &post_body,
            request_uri: IDP_REQUEST_URI,
            return_secure_token: true,
            return_idp_credential: true,
        };
        let response = self.accounts("signInWithIdp", &request).await?;
        self.establish(response).await
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        self.credentials.lock().await.take();
        self.changes.send_replace(None);
        Ok(())
    }

    async fn id_token(&self) -> Result<Option<SecretString>, IdentityError> {
        let mut guard = self.credentials.lock().await;
        let Some(credentials) = guard.as_mut() else {
            return Ok(None);
        };

        if credentials.is_stale() {
            self.refresh(credentials).await?;
        }

        Ok(Some(credentials.id_token.clone()))
    }

    #[instrument(skip_all)]
    async fn update_profile(&self, update: &ProfileUpdate) -> Result<Identity, IdentityError> {
        let mut guard = self.credentials.lock().await;
        let Some(credentials) = guard.as_mut() else {
            return Err(IdentityError::NotSignedIn);
        };

        if credentials.is_stale() {
            self.refresh(credentials).await?;
        }

        let request = UpdateRequest {
            id_token: credentials.id_token.expose_secret(),
            display_name: update.display_name.as_deref(),
            photo_url: update.photo_url.as_deref(),
            return_secure_token: true,
        };
        let response = self.accounts("update", &request).await?;

        let mut identity = credentials.identity.clone();
        update.apply_to(&mut identity);
        if let Some(name) = response.display_name.filter(|name| !name.is_empty()) {
            identity.display_name = Some(name);
        }
        if let Some(photo) = response.photo_url.filter(|url| !url.is_empty()) {
            identity.photo_url = Some(photo);
        }
        if let (Some(id_token), Some(refresh_token)) = (response.id_token, response.refresh_token)
        {
            credentials.id_token = SecretString::from(id_token);
            credentials.refresh_token = SecretString::from(refresh_token);
            credentials.expires_at = expiry_from(response.expires_in.as_deref());
        }
        credentials.identity = identity.clone();
        drop(guard);

        self.changes.send_replace(Some(identity.clone()));
        Ok(identity)
    }
}

/// Maps Identity Toolkit error messages (`CODE` or `CODE : detail`).
fn classify_error(message: &str) -> IdentityError {
    let code = message
        .split([':', ' '])
        .next()
        .unwrap_or_default()
        .trim();

    match code {
        "EMAIL_EXISTS" => IdentityError::EmailInUse,
        "WEAK_PASSWORD" => IdentityError::WeakPassword,
        "INVALID_EMAIL" | "MISSING_EMAIL" => IdentityError::InvalidEmail,
        "EMAIL_NOT_FOUND" | "USER_NOT_FOUND" => IdentityError::NotFound,
        "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "MISSING_PASSWORD" => {
            IdentityError::WrongPassword
        }
        _ => {
            warn!(code, "unclassified identity provider error");
            IdentityError::Unknown(code.to_string())
        }
    }
}

fn expiry_from(expires_in: Option<&str>) -> Instant {
    let seconds = expires_in
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECONDS);
    Instant::now() + Duration::from_secs(seconds).saturating_sub(TOKEN_REFRESH_BUFFER)
}

fn idp_post_body(credential: &FederatedCredential) -> String {
    form_urlencoded::Serializer::new(String::new())
        .append_pair("id_token", credential.id_token.expose_secret())
        .append_pair("providerId", &credential.provider_id)
        .finish()
}
