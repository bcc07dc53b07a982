//! Error classification and recovery hints.

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authentication,
    Network,
    Server,
    Api,
    Malformed,
    Configuration,
    Io,
}

/// Suggested recovery action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySuggestion {
    /// Run the device authorization flow again.
    Reauthenticate,
    RetryLater,
    CheckConfiguration,
    /// Nothing the operator can do; the next refresh may succeed.
    Ignore,
}

impl RecoverySuggestion {
    /// Follow-up advice for a person at a terminal, if any applies.
    pub fn hint(self) -> Option<&'static str> {
        match self {
            Self::Reauthenticate => Some("run `nightbot-sr auth login` to sign in again"),
            Self::RetryLater => Some("Nightbot may be unreachable; try again shortly"),
            Self::CheckConfiguration => Some("check the NIGHTBOT_* environment settings"),
            Self::Ignore => None,
        }
    }
}
