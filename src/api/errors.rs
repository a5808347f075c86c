use thiserror::Error;

/// Failures talking to the portal backend. Messages are safe to show to users;
/// bodies are sanitized before they land in `Http`.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Timeout: {0}")]
    Timeout(String),
    #[error("Request failed ({status}): {message}")]
    Http { status: u16, message: String },
    #[error("Response error: {0}")]
    Parse(String),
    #[error("Request error: {0}")]
    Serialization(String),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ApiError;

    #[test]
    fn display_includes_status_and_message() {
        let err = ApiError::Http {
            status: 503,
            message: "backend offline".to_string(),
        };
        assert_eq!(err.to_string(), "Request failed (503): backend offline");
        assert_eq!(err.status(), Some(503));
        assert_eq!(ApiError::Timeout("slow".to_string()).status(), None);
    }
}
