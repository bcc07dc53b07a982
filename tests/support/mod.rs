#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use nightbot_sr::auth::{
    AuthSession, CredentialStore, MemoryCredentialStore, NightbotDeviceAuth, Token, TokenStore,
};
use nightbot_sr::config::SrConfig;
use nightbot_sr::events::{EventBus, SrEvent};
use nightbot_sr::queue::QueueClient;
use nightbot_sr::transport::ApiTransport;
use serde_json::{json, Value};
use tokio::sync::broadcast::Receiver;
use wiremock::MockServer;

pub const ACCESS_TOKEN: &str = "test-token";

pub fn config(server: &MockServer) -> SrConfig {
    SrConfig::new()
        .with_api_url(server.uri())
        .with_auth_url(server.uri())
        .with_client_id("client-1")
        .with_http_timeout(Duration::from_secs(5))
        .with_refetch_delay(Duration::from_millis(100))
        .with_toggle_refetch_delay(Duration::from_millis(200))
}

pub fn token() -> Token {
    Token::bearer(ACCESS_TOKEN)
}

/// The wired-up client stack against a mock server.
pub struct Harness {
    pub config: SrConfig,
    pub tokens: Arc<TokenStore>,
    pub events: EventBus,
    pub session: AuthSession,
    pub transport: ApiTransport,
    pub client: QueueClient,
}

/// Builds the stack; when `signed_in`, the session is restored from a stored
/// token so it counts as authenticated.
pub fn harness(server: &MockServer, signed_in: bool) -> Harness {
    let config = config(server);
    let tokens = Arc::new(TokenStore::new());
    let events = EventBus::new();
    let credentials = Arc::new(MemoryCredentialStore::new());
    if signed_in {
        credentials.save(&token()).expect("seed credentials");
    }
    let authorizer = NightbotDeviceAuth::from_config(&config).expect("authorizer");
    let session = AuthSession::new(Arc::new(authorizer), Arc::clone(&tokens), events.clone())
        .with_credentials(credentials);
    assert_eq!(session.restore(), signed_in);

    let transport = ApiTransport::new(Arc::clone(&tokens), &config).expect("transport");
    let client = QueueClient::from_config(transport.clone(), events.clone(), &config)
        .with_session(session.clone());
    Harness {
        config,
        tokens,
        events,
        session,
        transport,
        client,
    }
}

pub fn queue_payload() -> Value {
    json!({
        "_requestsEnabled": true,
        "_currentSong": {"_id": "a", "track": {"title": "X", "duration": 125}},
        "queue": [
            {"_id": "b", "_position": 2, "track": {"title": "Y", "duration": 60}, "user": {"displayName": "bob"}},
            {"_id": "c", "_position": 1, "track": {"title": "Z", "duration": 30}, "user": {"displayName": "sue"}}
        ]
    })
}

/// Everything published so far, without waiting.
pub fn drain(rx: &mut Receiver<SrEvent>) -> Vec<SrEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Wait for the first event matching `pred`.
pub async fn wait_for<F>(rx: &mut Receiver<SrEvent>, mut pred: F) -> SrEvent
where
    F: FnMut(&SrEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let event = rx.recv().await.expect("event bus closed");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

/// Requests the server saw for `method` on `path`.
pub async fn count_requests(server: &MockServer, method: &str, path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.as_str() == method && r.url.path() == path)
        .count()
}
