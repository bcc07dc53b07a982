use thiserror::Error;

use crate::error::SrError;

/// Errors raised by the device authorization flow.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Not logged in")]
    NotLoggedIn,
    #[error("Access denied")]
    AccessDenied,
    #[error("Device code expired")]
    Expired,
    #[error("Missing client configuration: {0}")]
    Configuration(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AuthError {
    /// Transient failures that must not abort a pending authorization.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::InvalidResponse(error.to_string())
        } else {
            Self::Network(error.to_string())
        }
    }
}

impl From<std::io::Error> for AuthError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<toml::de::Error> for AuthError {
    fn from(error: toml::de::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<toml::ser::Error> for AuthError {
    fn from(error: toml::ser::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<AuthError> for SrError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::NotLoggedIn => SrError::NoToken,
            AuthError::AccessDenied => SrError::AuthorizationDenied,
            AuthError::Expired => SrError::AuthorizationExpired,
            AuthError::Network(msg) => SrError::TransportFailure(msg),
            AuthError::Configuration(msg) => SrError::Configuration(msg),
            AuthError::InvalidResponse(msg) | AuthError::Serialization(msg) => {
                SrError::MalformedResponse(msg)
            }
            AuthError::Io(msg) => SrError::Io(std::io::Error::other(msg)),
        }
    }
}
