use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::auth::backend::DeviceAuthorizer;
use crate::auth::device_code::{DeviceCodePoll, DeviceCodeSession};
use crate::auth::error::AuthError;
use crate::auth::token::Token;
use crate::config::SrConfig;

const DEVICE_CODE_PATH: &str = "/oauth2/device/code";
const TOKEN_PATH: &str = "/oauth2/token";
const DEVICE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";
const DEFAULT_INTERVAL_SECS: u64 = 5;
const SLOW_DOWN_STEP_SECS: u64 = 5;

/// Nightbot OAuth2 device-authorization client.
///
/// # Example
/// ```
/// use nightbot_sr::auth::NightbotDeviceAuth;
/// use nightbot_sr::config::SrConfig;
///
/// let config = SrConfig::new().with_client_id("client-id");
/// let auth = NightbotDeviceAuth::from_config(&config)?;
/// # Ok::<(), nightbot_sr::auth::AuthError>(())
/// ```
pub struct NightbotDeviceAuth {
    client: reqwest::Client,
    client_id: String,
    client_secret: Option<String>,
    scopes: String,
    device_code_url: String,
    token_url: String,
}

impl NightbotDeviceAuth {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            client_id: client_id.into(),
            client_secret: None,
            scopes: crate::config::DEFAULT_SCOPES.to_string(),
            device_code_url: format!("{}{DEVICE_CODE_PATH}", crate::config::DEFAULT_AUTH_URL),
            token_url: format!("{}{TOKEN_PATH}", crate::config::DEFAULT_AUTH_URL),
        }
    }

    /// Build from configuration; fails when no client id is configured.
    pub fn from_config(config: &SrConfig) -> Result<Self, AuthError> {
        let client_id = config
            .client_id()
            .ok_or_else(|| AuthError::Configuration("NIGHTBOT_CLIENT_ID is not set".into()))?;
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .connect_timeout(StdDuration::from_secs(5))
            .build()?;
        let base = config.auth_url().trim_end_matches('/');
        let mut auth = Self::new(client_id)
            .with_client(client)
            .with_scopes(config.scopes())
            .with_device_code_url(format!("{base}{DEVICE_CODE_PATH}"))
            .with_token_url(format!("{base}{TOKEN_PATH}"));
        if let Some(secret) = config.client_secret() {
            auth = auth.with_client_secret(secret);
        }
        Ok(auth)
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    pub fn with_scopes(mut self, scopes: impl Into<String>) -> Self {
        self.scopes = scopes.into();
        self
    }

    pub fn with_device_code_url(mut self, url: impl Into<String>) -> Self {
        self.device_code_url = url.into();
        self
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    fn client_params(&self) -> Vec<(&'static str, &str)> {
        let mut params = vec![("client_id", self.client_id.as_str())];
        if let Some(secret) = self.client_secret.as_deref() {
            params.push(("client_secret", secret));
        }
        params
    }
}

#[async_trait]
impl DeviceAuthorizer for NightbotDeviceAuth {
    async fn start_device_code(&self) -> Result<DeviceCodeSession, AuthError> {
        let mut params = self.client_params();
        params.push(("scope", self.scopes.as_str()));
        let resp = self
            .client
            .post(&self.device_code_url)
            .header("Accept", "application/json")
            .form(&params)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(AuthError::InvalidResponse(format!(
                "Device code request failed with status {}",
                resp.status()
            )));
        }
        let payload: DeviceCodeResponse = resp.json().await?;
        let verification_url = payload
            .verification_uri_complete
            .or(payload.verification_uri)
            .or(payload.verification_url)
            .ok_or_else(|| {
                AuthError::InvalidResponse("Device code response missing verification URL".into())
            })?;
        let expires_at = expiry_after(Utc::now(), payload.expires_in).ok_or_else(|| {
            AuthError::InvalidResponse(format!(
                "Device code lifetime out of range: {}s",
                payload.expires_in
            ))
        })?;
        let interval_secs = payload.interval.unwrap_or(DEFAULT_INTERVAL_SECS).max(1);
        tracing::info!(
            expires_in = payload.expires_in,
            interval_secs,
            "device authorization started"
        );
        Ok(DeviceCodeSession {
            verification_url,
            user_code: payload.user_code,
            device_code: payload.device_code,
            interval_secs,
            expires_in_secs: payload.expires_in,
            expires_at,
        })
    }

    async fn poll_device_code(
        &self,
        session: &DeviceCodeSession,
    ) -> Result<DeviceCodePoll, AuthError> {
        if Utc::now() >= session.expires_at {
            return Ok(DeviceCodePoll::Expired);
        }
        let mut params = self.client_params();
        params.push(("device_code", session.device_code.as_str()));
        params.push(("grant_type", DEVICE_GRANT_TYPE));
        let resp = self
            .client
            .post(&self.token_url)
            .header("Accept", "application/json")
            .form(&params)
            .send()
            .await?;
        let status = resp.status();
        // RFC 8628 reports pending/slow_down/denied as 400 with an `error` field.
        let body = resp.text().await?;
        let payload: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            AuthError::InvalidResponse(format!("Token response (status {status}) unreadable: {e}"))
        })?;
        if let Some(access_token) = payload.access_token.filter(|t| !t.is_empty()) {
            let now = Utc::now();
            let token = Token {
                access_token,
                refresh_token: payload.refresh_token,
                expires_at: payload.expires_in.and_then(|secs| expiry_after(now, secs)),
                obtained_at: Some(now),
                scopes: payload
                    .scope
                    .map(|s| s.split_whitespace().map(str::to_string).collect()),
            };
            return Ok(DeviceCodePoll::Authorized { token });
        }
        match payload.error.as_deref() {
            Some("authorization_pending") => Ok(DeviceCodePoll::Pending),
            Some("slow_down") => Ok(DeviceCodePoll::SlowDown {
                interval_secs: payload
                    .interval
                    .unwrap_or(session.interval_secs.saturating_add(SLOW_DOWN_STEP_SECS)),
            }),
            Some("expired_token") => Ok(DeviceCodePoll::Expired),
            Some("access_denied") => Ok(DeviceCodePoll::AccessDenied),
            Some(other) => Err(AuthError::InvalidResponse(format!(
                "Device token error: {other}"
            ))),
            None => Err(AuthError::InvalidResponse(format!(
                "Token response (status {status}) missing token and error"
            ))),
        }
    }
}

/// `now + secs`, or `None` when the sum is not a representable time.
fn expiry_after(now: DateTime<Utc>, secs: u64) -> Option<DateTime<Utc>> {
    let delta = Duration::try_seconds(i64::try_from(secs).ok()?)?;
    now.checked_add_signed(delta)
}

#[derive(Debug, Deserialize)]
struct DeviceCodeResponse {
    device_code: String,
    user_code: String,
    verification_uri: Option<String>,
    verification_uri_complete: Option<String>,
    verification_url: Option<String>,
    expires_in: u64,
    interval: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
    scope: Option<String>,
    error: Option<String>,
    interval: Option<u64>,
}
