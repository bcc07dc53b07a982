//! Configuration (layered: defaults < env < explicit setters) and the
//! host settings store.

pub mod settings;

pub use settings::{FileSettingsStore, MemorySettingsStore, Settings, SettingsStore};

use std::path::PathBuf;
use std::time::Duration;

use crate::error::SrError;

pub const DEFAULT_API_URL: &str = "https://api.nightbot.tv";
pub const DEFAULT_AUTH_URL: &str = "https://api.nightbot.tv";
pub const DEFAULT_SCOPES: &str = "song_requests song_requests_queue";

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_REFETCH_DELAY_MS: u64 = 500;
const DEFAULT_TOGGLE_REFETCH_DELAY_MS: u64 = 1000;
const DEFAULT_MAX_IN_FLIGHT: usize = 4;

/// Runtime configuration for the client.
///
/// # Example
/// ```
/// use nightbot_sr::config::SrConfig;
///
/// let config = SrConfig::new()
///     .with_client_id("my-client")
///     .with_api_url("http://localhost:8080");
/// assert_eq!(config.api_url(), "http://localhost:8080");
/// ```
#[derive(Clone)]
pub struct SrConfig {
    api_url: String,
    auth_url: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    scopes: String,
    http_timeout: Duration,
    refetch_delay: Duration,
    toggle_refetch_delay: Duration,
    max_in_flight: usize,
    data_dir: PathBuf,
}

impl std::fmt::Debug for SrConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SrConfig")
            .field("api_url", &self.api_url)
            .field("auth_url", &self.auth_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[REDACTED]"))
            .field("scopes", &self.scopes)
            .field("http_timeout", &self.http_timeout)
            .field("refetch_delay", &self.refetch_delay)
            .field("toggle_refetch_delay", &self.toggle_refetch_delay)
            .field("max_in_flight", &self.max_in_flight)
            .field("data_dir", &self.data_dir)
            .finish()
    }
}

impl Default for SrConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SrConfig {
    pub fn new() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            client_id: None,
            client_secret: None,
            scopes: DEFAULT_SCOPES.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            refetch_delay: Duration::from_millis(DEFAULT_REFETCH_DELAY_MS),
            toggle_refetch_delay: Duration::from_millis(DEFAULT_TOGGLE_REFETCH_DELAY_MS),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            data_dir: default_data_dir(),
        }
    }

    /// Load from environment variables (`NIGHTBOT_CLIENT_ID`, ...), reading a
    /// `.env` file first when present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let mut config = Self::new();

        if let Some(id) = env_var("NIGHTBOT_CLIENT_ID") {
            config.client_id = Some(id);
        }
        if let Some(secret) = env_var("NIGHTBOT_CLIENT_SECRET") {
            config.client_secret = Some(secret);
        }
        if let Some(url) = env_var("NIGHTBOT_API_URL") {
            config.api_url = url;
        }
        if let Some(url) = env_var("NIGHTBOT_AUTH_URL") {
            config.auth_url = url;
        }
        if let Some(dir) = env_var("NIGHTBOT_SR_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        match env_var("NIGHTBOT_HTTP_TIMEOUT_SECS").map(|raw| raw.parse::<u64>()) {
            Some(Ok(secs)) if secs > 0 => config.http_timeout = Duration::from_secs(secs),
            Some(_) => tracing::warn!("ignoring invalid NIGHTBOT_HTTP_TIMEOUT_SECS"),
            None => {}
        }

        config
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth_url = url.into();
        self
    }

    pub fn with_client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = Some(id.into());
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

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn with_refetch_delay(mut self, delay: Duration) -> Self {
        self.refetch_delay = delay;
        self
    }

    pub fn with_toggle_refetch_delay(mut self, delay: Duration) -> Self {
        self.toggle_refetch_delay = delay;
        self
    }

    /// Width of the background dispatcher. Clamped to at least 1.
    pub fn with_max_in_flight(mut self, max: usize) -> Self {
        self.max_in_flight = max.max(1);
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn auth_url(&self) -> &str {
        &self.auth_url
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    pub fn client_secret(&self) -> Option<&str> {
        self.client_secret.as_deref()
    }

    pub fn scopes(&self) -> &str {
        &self.scopes
    }

    pub fn http_timeout(&self) -> Duration {
        self.http_timeout
    }

    pub fn refetch_delay(&self) -> Duration {
        self.refetch_delay
    }

    pub fn toggle_refetch_delay(&self) -> Duration {
        self.toggle_refetch_delay
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    pub fn data_dir(&self) -> &std::path::Path {
        &self.data_dir
    }

    /// Client id, or a configuration error naming the variable to set.
    pub fn require_client_id(&self) -> Result<&str, SrError> {
        self.client_id().ok_or_else(|| {
            SrError::Configuration("NIGHTBOT_CLIENT_ID is not set".to_string())
        })
    }
}

/// `~/.nightbot-sr`, or a relative fallback when no home directory exists.
pub fn default_data_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".nightbot-sr"))
        .unwrap_or_else(|| PathBuf::from(".nightbot-sr"))
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}
