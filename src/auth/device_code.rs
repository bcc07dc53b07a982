use chrono::{DateTime, Utc};

use super::Token;

/// Device-code session details returned by the authorization server.
///
/// # Example
/// ```
/// use nightbot_sr::auth::DeviceCodeSession;
/// use chrono::{Duration, Utc};
///
/// let session = DeviceCodeSession {
///     verification_url: "https://nightbot.tv/oauth2/device".to_string(),
///     user_code: "ABCD-EFGH".to_string(),
///     device_code: "device-code".to_string(),
///     interval_secs: 5,
///     expires_in_secs: 600,
///     expires_at: Utc::now() + Duration::seconds(600),
/// };
/// assert_eq!(session.interval_secs, 5);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceCodeSession {
    pub verification_url: String,
    pub user_code: String,
    pub device_code: String,
    pub interval_secs: u64,
    pub expires_in_secs: u64,
    pub expires_at: DateTime<Utc>,
}

/// Polling outcome for a device-code session.
#[derive(Debug, Clone)]
pub enum DeviceCodePoll {
    Pending,
    SlowDown { interval_secs: u64 },
    Authorized { token: Token },
    AccessDenied,
    Expired,
}
