//! Error types for emolabel

use thiserror::Error;

/// Result type alias using emolabel's Error
pub type Result<T> = std::result::Result<T, Error>;

/// emolabel error types
#[derive(Error, Debug)]
pub enum Error {
    /// The request never produced a response (connect refused, DNS, timeout, body read).
    #[error("Network error: {message}")]
    Network { message: String },

    /// The server answered with a non-2xx status or a `{success: false}` body.
    #[error("Server error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Not logged in (run 'emolabel login' first)")]
    NotAuthenticated,

    #[error("{message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Prompt failed: {message}")]
    Prompt { message: String },

    #[error("Player error: {message}")]
    Player { message: String },

    /// A response arrived for a request that has since been superseded.
    #[error("Request superseded by a newer one")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }

    /// True when the request failed before any HTTP response arrived
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network { .. })
    }

    /// True when the server responded but reported a failure
    pub fn is_api(&self) -> bool {
        matches!(self, Error::Api { .. })
    }

    /// HTTP status for server-side failures
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_classes() {
        let net = Error::Network {
            message: "connection refused".to_string(),
        };
        let api = Error::Api {
            status: 404,
            message: "标注不存在".to_string(),
        };

        assert!(net.is_network());
        assert!(!net.is_api());
        assert!(api.is_api());
        assert_eq!(api.status(), Some(404));
        assert_eq!(net.status(), None);
    }

    #[test]
    fn test_validation_message_is_bare() {
        let err = Error::validation("Please enter a nickname");
        assert_eq!(err.to_string(), "Please enter a nickname");
    }
}
