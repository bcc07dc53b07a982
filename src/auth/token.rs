use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OAuth access token issued by the device flow.
///
/// # Example
/// ```
/// use nightbot_sr::auth::Token;
///
/// let token = Token::bearer("access");
/// assert!(!token.is_expired());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub obtained_at: Option<DateTime<Utc>>,
    pub scopes: Option<Vec<String>>,
}

impl Token {
    /// A token with no expiry metadata.
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
            obtained_at: Some(Utc::now()),
            scopes: None,
        }
    }

    /// True once a locally known expiry has passed. Tokens without expiry
    /// metadata never expire locally; the API's 401 is the only signal.
    pub fn is_expired(&self) -> bool {
        self.expires_at.map(|exp| exp <= Utc::now()).unwrap_or(false)
    }
}
