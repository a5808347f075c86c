//! Endpoint and policy configuration for the portal core. Values come from the
//! CLI (flags with environment fallbacks) and are normalized here so the rest
//! of the crate never deals with stray whitespace or trailing slashes. The
//! Firebase web API key is kept out of logs.

use secrecy::SecretString;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";
pub const DEFAULT_TOKEN_BASE_URL: &str = "https://securetoken.googleapis.com/v1";
pub const DEFAULT_ROLE_CACHE_TTL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct PortalConfig {
    pub api_base_url: String,
    pub identity_base_url: String,
    pub token_base_url: String,
    pub firebase_api_key: SecretString,
    pub role_cache_ttl: Duration,
    pub request_timeout: Duration,
}

impl PortalConfig {
    /// Builds a config with default endpoints and the given Firebase API key.
    #[must_use]
    pub fn new(firebase_api_key: SecretString) -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            identity_base_url: DEFAULT_IDENTITY_BASE_URL.to_string(),
            token_base_url: DEFAULT_TOKEN_BASE_URL.to_string(),
            firebase_api_key,
            role_cache_ttl: DEFAULT_ROLE_CACHE_TTL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_api_base_url(mut self, url: &str) -> Self {
        if let Some(url) = normalize_base_url(url) {
            self.api_base_url = url;
        }
        self
    }

    #[must_use]
    pub fn with_identity_base_url(mut self, url: &str) -> Self {
        if let Some(url) = normalize_base_url(url) {
            self.identity_base_url = url;
        }
        self
    }

    #[must_use]
    pub fn with_token_base_url(mut self, url: &str) -> Self {
        if let Some(url) = normalize_base_url(url) {
            self.token_base_url = url;
        }
        self
    }

    #[must_use]
    pub fn with_role_cache_ttl(mut self, ttl: Duration) -> Self {
        self.role_cache_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl std::fmt::Debug for PortalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalConfig")
            .field("api_base_url", &self.api_base_url)
            .field("identity_base_url", &self.identity_base_url)
            .field("token_base_url", &self.token_base_url)
            .field("firebase_api_key", &"***")
            .field("role_cache_ttl", &self.role_cache_ttl)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Trims whitespace and trailing slashes; empty values are rejected so the
/// caller keeps its default.
#[must_use]
pub fn normalize_base_url(value: &str) -> Option<String> {
    let trimmed = value.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn normalize_base_url_trims_and_rejects_empty() {
        assert_eq!(normalize_base_url(""), None);
        assert_eq!(normalize_base_url("   "), None);
        assert_eq!(normalize_base_url("/"), None);
        assert_eq!(
            normalize_base_url("  https://api.scholarstream.dev/ "),
            Some("https://api.scholarstream.dev".to_string())
        );
    }

    #[test]
    fn builders_ignore_empty_values() {
        let config = PortalConfig::new(SecretString::from("key".to_string()))
            .with_api_base_url(" ")
            .with_identity_base_url("")
            .with_token_base_url("  ");

        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.identity_base_url, DEFAULT_IDENTITY_BASE_URL);
        assert_eq!(config.token_base_url, DEFAULT_TOKEN_BASE_URL);
        assert_eq!(config.firebase_api_key.expose_secret(), "key");
    }

    #[test]
    fn builders_override_when_present() {
        let config = PortalConfig::new(SecretString::default())
            .with_api_base_url("https://api.override/")
            .with_identity_base_url("http://127.0.0.1:9099/identitytoolkit.googleapis.com/v1")
            .with_token_base_url("http://127.0.0.1:9099/securetoken.googleapis.com/v1")
            .with_role_cache_ttl(Duration::from_secs(30))
            .with_request_timeout(Duration::from_secs(2));

        assert_eq!(config.api_base_url, "https://api.override");
        assert_eq!(
            config.identity_base_url,
            "http://127.0.0.1:9099/identitytoolkit.googleapis.com/v1"
        );
        assert_eq!(
            config.token_base_url,
            "http://127.0.0.1:9099/securetoken.googleapis.com/v1"
        );
        assert_eq!(config.role_cache_ttl, Duration::from_secs(30));
        assert_eq!(config.request_timeout, Duration::from_secs(2));
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = PortalConfig::new(SecretString::from("super-secret".to_string()));
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("***"));
    }
}
