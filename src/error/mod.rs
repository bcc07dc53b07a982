//! Error types for the song-request client.

pub mod unified;

pub use unified::{ErrorCategory, RecoverySuggestion};

use thiserror::Error;

/// Primary error type for queue and transport operations.
#[derive(Error, Debug)]
pub enum SrError {
    /// No access token is held; nothing was sent.
    #[error("Not authenticated")]
    NoToken,

    /// No HTTP response was obtained (DNS, TLS, connect, timeout).
    #[error("Transport failure: {0}")]
    TransportFailure(String),

    /// The remote API answered with a non-2xx status.
    #[error("Request rejected (status {status}): {message}")]
    RemoteRejected { status: u16, message: String },

    /// A 2xx response whose body could not be decoded.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Authorization denied")]
    AuthorizationDenied,

    #[error("Authorization expired")]
    AuthorizationExpired,

    /// Rejected locally before anything was sent.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SrError {
    /// Create a rejection error for a received status.
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::RemoteRejected {
            status,
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NoToken | Self::AuthorizationDenied | Self::AuthorizationExpired => {
                ErrorCategory::Authentication
            }
            Self::TransportFailure(_) => ErrorCategory::Network,
            Self::RemoteRejected { status, .. } => match status {
                401 | 403 => ErrorCategory::Authentication,
                500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::Api,
            },
            Self::MalformedResponse(_) => ErrorCategory::Malformed,
            Self::InvalidInput(_) => ErrorCategory::Api,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Io(_) => ErrorCategory::Io,
        }
    }

    /// Whether repeating the same request later could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self.category(), ErrorCategory::Network | ErrorCategory::Server)
    }

    /// Whether the remote API told us the bearer token is no longer valid.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::RemoteRejected { status: 401, .. })
    }

    /// Suggest recovery actions.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self.category() {
            ErrorCategory::Authentication => RecoverySuggestion::Reauthenticate,
            ErrorCategory::Network | ErrorCategory::Server => RecoverySuggestion::RetryLater,
            ErrorCategory::Configuration | ErrorCategory::Io => {
                RecoverySuggestion::CheckConfiguration
            }
            ErrorCategory::Api | ErrorCategory::Malformed => RecoverySuggestion::Ignore,
        }
    }

    /// Text suitable for an inline status label.
    ///
    /// Only remote rejections carry something worth showing; everything else
    /// collapses to a generic failure.
    pub fn user_message(&self) -> String {
        match self {
            Self::RemoteRejected { status, message } if !message.is_empty() => {
                format!("{message} ({status})")
            }
            Self::RemoteRejected { status, .. } => format!("Request failed ({status})"),
            Self::InvalidInput(message) => message.clone(),
            _ => "Request failed".to_string(),
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, SrError>;
