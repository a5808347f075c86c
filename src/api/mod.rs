//! HTTP helpers for the portal's JSON backend with a consistent timeout and
//! error policy. Feature clients go through [`ApiClient`] instead of building
//! requests by hand, so bearer handling and error sanitizing live in one place.
//! The client never stores tokens; callers pass one per request.

mod errors;

pub use errors::ApiError;

use crate::{APP_USER_AGENT, config::PortalConfig};
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;
use tracing::{Instrument, debug, info_span};
use url::Url;

/// Maximum number of error body characters surfaced to callers.
const MAX_ERROR_CHARS: usize = 200;

#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Builds a client for `base_url` with the given request timeout.
    ///
    /// # Errors
    /// Returns `ApiError::Config` if the URL is not absolute or the HTTP client
    /// cannot be initialized.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url.trim())
            .map_err(|err| ApiError::Config(format!("Invalid API base URL: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Config(format!(
                "API base URL cannot carry paths: {base_url}"
            )));
        }

        let client = http_client(timeout)?;
        Ok(Self { client, base_url })
    }

    /// # Errors
    /// Returns `ApiError::Config` if the configured API URL is invalid.
    pub fn from_config(config: &PortalConfig) -> Result<Self, ApiError> {
        Self::new(&config.api_base_url, config.request_timeout)
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Joins path segments onto the base URL, percent-encoding each one, so an
    /// email such as `a+b@x.io` stays a single segment.
    ///
    /// # Errors
    /// Returns `ApiError::Config` if the base URL cannot be extended.
    pub fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| ApiError::Config("API base URL cannot carry paths".to_string()))?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    /// Fetches JSON, attaching the bearer token when provided.
    ///
    /// # Errors
    /// Returns an `ApiError` on transport failure, timeout, non-2xx status or an
    /// undecodable body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        bearer: Option<&SecretString>,
    ) -> Result<T, ApiError> {
        let url = self.url(segments)?;
        let span = info_span!("api.get", http.method = "GET", url = %url);
        let request = with_bearer(self.client.get(url), bearer);
        let response = send(request).instrument(span).await?;
        handle_json_response(response).await
    }

    /// Posts a JSON body and parses a JSON response.
    ///
    /// # Errors
    /// Returns an `ApiError` on encoding failure, transport failure, timeout,
    /// non-2xx status or an undecodable body.
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
        bearer: Option<&SecretString>,
    ) -> Result<T, ApiError> {
        let url = self.url(segments)?;
        let payload = serde_json::to_vec(body)
            .map_err(|err| ApiError::Serialization(format!("Failed to encode request: {err}")))?;
        let span = info_span!("api.post", http.method = "POST", url = %url);
        let request = with_bearer(
            self.client
                .post(url)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(payload),
            bearer,
        );
        let response = send(request).instrument(span).await?;
        handle_json_response(response).await
    }
}

/// Builds the shared reqwest client with the crate user agent.
///
/// # Errors
/// Returns `ApiError::Config` if the TLS backend cannot be initialized.
pub fn http_client(timeout: Duration) -> Result<Client, ApiError> {
    Client::builder()
        .user_agent(APP_USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|err| ApiError::Config(format!("Failed to build HTTP client: {err}")))
}

fn with_bearer(request: RequestBuilder, bearer: Option<&SecretString>) -> RequestBuilder {
    match bearer {
        Some(token) => request.bearer_auth(token.expose_secret()),
        None => request,
    }
}

async fn send(request: RequestBuilder) -> Result<Response, ApiError> {
    request.send().await.map_err(map_request_error)
}

/// Maps transport errors into `ApiError` variants with timeout detection.
pub(crate) fn map_request_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout("Request timed out. Please try again.".to_string())
    } else {
        ApiError::Network(format!("Unable to reach the server: {err}"))
    }
}

/// Parses JSON responses and surfaces HTTP errors with sanitized bodies.
async fn handle_json_response<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    if status.is_success() {
        let body = response.bytes().await.map_err(map_request_error)?;
        serde_json::from_slice(&body)
            .map_err(|err| ApiError::Parse(format!("Failed to decode response: {err}")))
    } else {
        let body = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), "backend returned an error status");
        Err(ApiError::Http {
            status: status.as_u16(),
            message: sanitize_body(&body),
        })
    }
}

/// Trims and truncates HTTP error bodies for user-facing messages.
#[must_use]
pub fn sanitize_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "Request failed.".to_string()
    } else {
        trimmed.chars().take(MAX_ERROR_CHARS).collect()
    }
}
