//! Device-authorization session: owns the auth state machine and is the only
//! writer of the [`TokenStore`].

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::backend::DeviceAuthorizer;
use super::credentials::CredentialStore;
use super::device_code::{DeviceCodePoll, DeviceCodeSession};
use super::error::AuthError;
use super::store::TokenStore;
use super::token::Token;
use crate::events::{EventBus, SrEvent};

/// Longest gap between token polls, whatever the server asks for.
const MAX_POLL_INTERVAL_SECS: u64 = 300;

fn poll_interval(secs: u64) -> Duration {
    Duration::from_secs(secs.clamp(1, MAX_POLL_INTERVAL_SECS))
}

/// Where the session currently stands.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    Unauthenticated,
    Pending {
        device_code: String,
        expires_at: DateTime<Utc>,
        interval_secs: u64,
        remaining_secs: u64,
    },
    Authenticated,
}

/// Result of [`AuthSession::authenticate`].
#[derive(Debug, Clone)]
pub enum AuthStart {
    /// A new flow started; show `verification_url` and `user_code`.
    Started(DeviceCodeSession),
    /// A flow is already running; nothing was started.
    InProgress,
    AlreadyAuthenticated,
    /// Tokens were cleared while the device code was being requested.
    Cancelled,
}

struct Flow {
    id: u64,
    cancel: CancellationToken,
}

struct SessionState {
    state: AuthState,
    flow: Option<Flow>,
    next_flow_id: u64,
}

/// OAuth2 device-flow state machine.
///
/// Cheap to clone; clones share state. At most one polling loop runs at a
/// time, and [`clear_tokens`](Self::clear_tokens) stops it before returning:
/// no countdown or completion event is published for a cancelled flow.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use nightbot_sr::auth::{AuthSession, AuthStart, NightbotDeviceAuth, TokenStore};
/// use nightbot_sr::config::SrConfig;
/// use nightbot_sr::events::EventBus;
///
/// # async fn example() -> Result<(), nightbot_sr::auth::AuthError> {
/// let config = SrConfig::from_env();
/// let authorizer = Arc::new(NightbotDeviceAuth::from_config(&config)?);
/// let session = AuthSession::new(authorizer, Arc::new(TokenStore::new()), EventBus::new());
/// if let AuthStart::Started(device) = session.authenticate().await? {
///     println!("Visit {} and enter {}", device.verification_url, device.user_code);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AuthSession {
    authorizer: Arc<dyn DeviceAuthorizer>,
    tokens: Arc<TokenStore>,
    credentials: Option<Arc<dyn CredentialStore>>,
    events: EventBus,
    shared: Arc<Mutex<SessionState>>,
}

impl AuthSession {
    pub fn new(
        authorizer: Arc<dyn DeviceAuthorizer>,
        tokens: Arc<TokenStore>,
        events: EventBus,
    ) -> Self {
        Self {
            authorizer,
            tokens,
            credentials: None,
            events,
            shared: Arc::new(Mutex::new(SessionState {
                state: AuthState::Unauthenticated,
                flow: None,
                next_flow_id: 0,
            })),
        }
    }

    /// Persist issued tokens and forget them on sign-out.
    pub fn with_credentials(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.credentials = Some(store);
        self
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    pub fn state(&self) -> AuthState {
        self.lock().state.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        let shared = self.lock();
        self.authenticated(&shared)
    }

    /// Load a previously persisted token. Returns whether the session is now
    /// authenticated. Expired tokens are discarded.
    pub fn restore(&self) -> bool {
        let Some(store) = &self.credentials else {
            return false;
        };
        let token = match store.load() {
            Ok(Some(token)) => token,
            Ok(None) => return false,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load stored credentials");
                return false;
            }
        };
        if token.access_token.is_empty() || token.is_expired() {
            tracing::info!("stored token expired; sign in again");
            if let Err(e) = store.clear() {
                tracing::warn!(error = %e, "failed to clear stale credentials");
            }
            return false;
        }
        let mut shared = self.lock();
        if shared.flow.is_some() {
            return false;
        }
        self.tokens.set_token(token);
        shared.state = AuthState::Authenticated;
        tracing::info!("restored stored token");
        true
    }

    /// Start the device flow unless one is running or a token is held.
    pub async fn authenticate(&self) -> Result<AuthStart, AuthError> {
        let (flow_id, cancel) = {
            let mut shared = self.lock();
            if self.authenticated(&shared) {
                return Ok(AuthStart::AlreadyAuthenticated);
            }
            if shared.flow.is_some() {
                return Ok(AuthStart::InProgress);
            }
            shared.next_flow_id += 1;
            let id = shared.next_flow_id;
            let cancel = CancellationToken::new();
            shared.flow = Some(Flow {
                id,
                cancel: cancel.clone(),
            });
            (id, cancel)
        };

        let started = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(AuthStart::Cancelled),
            result = self.authorizer.start_device_code() => result,
        };

        let device = match started {
            Ok(device) => device,
            Err(e) => {
                tracing::error!(error = %e, "device authorization request failed");
                self.finish(flow_id, None);
                return Err(e);
            }
        };

        {
            let mut shared = self.lock();
            if !owns_flow(&shared, flow_id) {
                return Ok(AuthStart::Cancelled);
            }
            shared.state = AuthState::Pending {
                device_code: device.device_code.clone(),
                expires_at: device.expires_at,
                interval_secs: device.interval_secs,
                remaining_secs: device.expires_in_secs,
            };
            self.events.publish(SrEvent::VerificationRequired {
                verification_url: device.verification_url.clone(),
                user_code: device.user_code.clone(),
            });
        }

        let this = self.clone();
        let polled = device.clone();
        tokio::spawn(async move { this.run_flow(flow_id, cancel, polled).await });

        Ok(AuthStart::Started(device))
    }

    /// Sign out: forget every token and stop any running flow. Idempotent.
    pub fn clear_tokens(&self) {
        let mut shared = self.lock();
        if let Some(flow) = shared.flow.take() {
            flow.cancel.cancel();
            tracing::info!("authorization flow cancelled");
        }
        shared.state = AuthState::Unauthenticated;
        self.tokens.clear();
        if let Some(store) = &self.credentials {
            if let Err(e) = store.clear() {
                tracing::warn!(error = %e, "failed to clear stored credentials");
            }
        }
    }

    /// React to the API rejecting the bearer token. Only an authenticated
    /// session is affected; returns whether anything changed.
    pub fn invalidate(&self) -> bool {
        let mut shared = self.lock();
        if shared.state != AuthState::Authenticated {
            return false;
        }
        shared.state = AuthState::Unauthenticated;
        self.tokens.clear();
        if let Some(store) = &self.credentials {
            if let Err(e) = store.clear() {
                tracing::warn!(error = %e, "failed to clear stored credentials");
            }
        }
        tracing::warn!("access token rejected by the API; signed out");
        self.events.publish(SrEvent::SessionExpired);
        true
    }

    /// Stop a running flow without touching stored credentials.
    pub fn shutdown(&self) {
        let mut shared = self.lock();
        if let Some(flow) = shared.flow.take() {
            flow.cancel.cancel();
            if matches!(shared.state, AuthState::Pending { .. }) {
                shared.state = AuthState::Unauthenticated;
            }
        }
    }

    async fn run_flow(self, flow_id: u64, cancel: CancellationToken, device: DeviceCodeSession) {
        let mut remaining = device.expires_in_secs;
        let mut poll_every = poll_interval(device.interval_secs);
        let started = Instant::now();
        let mut next_poll = started + poll_every;
        let mut ticker =
            tokio::time::interval_at(started + Duration::from_secs(1), Duration::from_secs(1));

        if !self.publish_countdown(flow_id, remaining) {
            return;
        }
        if remaining == 0 {
            self.finish(flow_id, None);
            return;
        }

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                _ = ticker.tick() => {
                    remaining = remaining.saturating_sub(1);
                    if !self.publish_countdown(flow_id, remaining) {
                        return;
                    }
                    if remaining == 0 {
                        tracing::warn!("authorization window expired");
                        self.finish(flow_id, None);
                        return;
                    }
                }
                _ = tokio::time::sleep_until(next_poll) => {
                    let polled = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return,
                        result = self.authorizer.poll_device_code(&device) => result,
                    };
                    match polled {
                        Ok(DeviceCodePoll::Pending) => {
                            tracing::debug!(remaining, "authorization pending");
                        }
                        Ok(DeviceCodePoll::SlowDown { interval_secs }) => {
                            poll_every = poll_interval(interval_secs);
                            tracing::debug!(interval_secs, "authorization server asked to slow down");
                        }
                        Ok(DeviceCodePoll::Authorized { token }) => {
                            self.finish(flow_id, Some(token));
                            return;
                        }
                        Ok(DeviceCodePoll::AccessDenied) => {
                            tracing::warn!("authorization denied by user");
                            self.finish(flow_id, None);
                            return;
                        }
                        Ok(DeviceCodePoll::Expired) => {
                            tracing::warn!("device code expired");
                            self.finish(flow_id, None);
                            return;
                        }
                        Err(e) if e.is_transient() => {
                            tracing::warn!(error = %e, "token poll failed; retrying");
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "token poll failed");
                            self.finish(flow_id, None);
                            return;
                        }
                    }
                    next_poll = Instant::now() + poll_every;
                }
            }
        }
    }

    fn publish_countdown(&self, flow_id: u64, remaining: u64) -> bool {
        let mut shared = self.lock();
        if !owns_flow(&shared, flow_id) {
            return false;
        }
        if let AuthState::Pending { remaining_secs, .. } = &mut shared.state {
            *remaining_secs = remaining;
        }
        self.events.publish(SrEvent::AuthCountdown {
            remaining_secs: remaining,
        });
        true
    }

    fn finish(&self, flow_id: u64, token: Option<Token>) {
        let mut shared = self.lock();
        if !owns_flow(&shared, flow_id) {
            return;
        }
        shared.flow = None;
        let success = match token {
            Some(token) => {
                if let Some(store) = &self.credentials {
                    if let Err(e) = store.save(&token) {
                        tracing::warn!(error = %e, "failed to persist token");
                    }
                }
                self.tokens.set_token(token);
                shared.state = AuthState::Authenticated;
                tracing::info!("authorization granted");
                true
            }
            None => {
                shared.state = AuthState::Unauthenticated;
                false
            }
        };
        self.events.publish(SrEvent::AuthCompleted { success });
    }

    fn authenticated(&self, shared: &SessionState) -> bool {
        shared.state == AuthState::Authenticated && self.tokens.has_token()
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.shared
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn owns_flow(shared: &SessionState, flow_id: u64) -> bool {
    shared.flow.as_ref().map(|flow| flow.id) == Some(flow_id)
}
