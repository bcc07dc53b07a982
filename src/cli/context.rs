//! Wires the client components together from environment configuration.

use std::sync::Arc;

use async_trait::async_trait;

use crate::auth::{
    AuthError, AuthSession, DeviceAuthorizer, DeviceCodePoll, DeviceCodeSession,
    FileCredentialStore, NightbotDeviceAuth, TokenStore,
};
use crate::config::{FileSettingsStore, SettingsStore, SrConfig};
use crate::events::EventBus;
use crate::queue::QueueClient;
use crate::sync::SyncCoordinator;
use crate::transport::ApiTransport;

/// Everything a command needs, built once per invocation.
pub struct Context {
    pub config: SrConfig,
    pub events: EventBus,
    pub tokens: Arc<TokenStore>,
    pub session: AuthSession,
    pub client: QueueClient,
    pub sync: SyncCoordinator,
    pub settings: Arc<FileSettingsStore>,
}

impl Context {
    /// Build from the environment and restore any stored token.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let config = SrConfig::from_env();
        let events = EventBus::new();
        let tokens = Arc::new(TokenStore::new());

        let authorizer: Arc<dyn DeviceAuthorizer> = match NightbotDeviceAuth::from_config(&config) {
            Ok(auth) => Arc::new(auth),
            Err(e) => {
                tracing::debug!(error = %e, "device authorization unavailable");
                Arc::new(Unconfigured)
            }
        };
        let credentials = Arc::new(FileCredentialStore::in_dir(config.data_dir()));
        let session = AuthSession::new(authorizer, Arc::clone(&tokens), events.clone())
            .with_credentials(credentials);
        session.restore();

        let transport = ApiTransport::new(Arc::clone(&tokens), &config)?;
        let client = QueueClient::from_config(transport, events.clone(), &config)
            .with_session(session.clone());
        let settings = Arc::new(FileSettingsStore::open_in(config.data_dir())?);
        let sync = SyncCoordinator::new(
            client.clone(),
            Arc::clone(&tokens),
            Arc::clone(&settings) as Arc<dyn SettingsStore>,
            &config,
        );

        Ok(Self {
            config,
            events,
            tokens,
            session,
            client,
            sync,
            settings,
        })
    }

    /// Fails with a hint when no token is held.
    pub fn require_login(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.session.is_authenticated() {
            Ok(())
        } else {
            Err("not signed in; run `nightbot-sr auth login` first".into())
        }
    }
}

/// Stand-in used when no client id is configured.
struct Unconfigured;

#[async_trait]
impl DeviceAuthorizer for Unconfigured {
    async fn start_device_code(&self) -> Result<DeviceCodeSession, AuthError> {
        Err(AuthError::Configuration(
            "NIGHTBOT_CLIENT_ID is not set".into(),
        ))
    }

    async fn poll_device_code(
        &self,
        _session: &DeviceCodeSession,
    ) -> Result<DeviceCodePoll, AuthError> {
        Err(AuthError::Configuration(
            "NIGHTBOT_CLIENT_ID is not set".into(),
        ))
    }
}
