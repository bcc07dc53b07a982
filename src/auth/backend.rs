//! Seam between the session state machine and the authorization server.

use async_trait::async_trait;

use super::device_code::{DeviceCodePoll, DeviceCodeSession};
use super::error::AuthError;

/// Talks to an OAuth2 device-authorization server.
///
/// Implementations perform exactly one HTTP exchange per call and never
/// loop or sleep; pacing belongs to [`super::AuthSession`].
#[async_trait]
pub trait DeviceAuthorizer: Send + Sync {
    /// Request a device code, user code and verification URL.
    async fn start_device_code(&self) -> Result<DeviceCodeSession, AuthError>;

    /// Ask whether the user has approved `session` yet.
    async fn poll_device_code(
        &self,
        session: &DeviceCodeSession,
    ) -> Result<DeviceCodePoll, AuthError>;
}
