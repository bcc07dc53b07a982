mod support;

use std::sync::Arc;

use chrono::{Duration, Utc};
use nightbot_sr::auth::{
    AuthError, AuthSession, AuthStart, AuthState, DeviceAuthorizer, DeviceCodePoll,
    DeviceCodeSession, NightbotDeviceAuth, TokenStore,
};
use nightbot_sr::events::{EventBus, SrEvent};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn active_session(interval_secs: u64) -> DeviceCodeSession {
    DeviceCodeSession {
        verification_url: "https://nightbot.tv/oauth2/device".to_string(),
        user_code: "ABCD-EFGH".to_string(),
        device_code: "device-code-1".to_string(),
        interval_secs,
        expires_in_secs: 600,
        expires_at: Utc::now() + Duration::minutes(10),
    }
}

fn nightbot_auth(server: &MockServer) -> NightbotDeviceAuth {
    NightbotDeviceAuth::from_config(&support::config(server)).expect("authorizer")
}

async fn mount_token_response(server: &MockServer, body: serde_json::Value, status: u16) {
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn start_device_code_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/device/code"))
        .and(header("accept", "application/json"))
        .and(body_string_contains("client_id=client-1"))
        .and(body_string_contains("scope=song_requests+song_requests_queue"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "device_code": "device-123",
            "user_code": "ABCD-EFGH",
            "verification_uri": "https://nightbot.tv/oauth2/device",
            "expires_in": 900,
            "interval": 5
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = nightbot_auth(&server)
        .start_device_code()
        .await
        .expect("start device code");

    assert_eq!(session.device_code, "device-123");
    assert_eq!(session.user_code, "ABCD-EFGH");
    assert_eq!(session.verification_url, "https://nightbot.tv/oauth2/device");
    assert_eq!(session.interval_secs, 5);
    assert_eq!(session.expires_in_secs, 900);
    assert!(session.expires_at > Utc::now());
}

#[tokio::test]
async fn start_device_code_rejection_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/device/code"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_client"})))
        .mount(&server)
        .await;

    let result = nightbot_auth(&server).start_device_code().await;

    assert!(matches!(result, Err(AuthError::InvalidResponse(_))));
}

#[tokio::test]
async fn poll_pending() {
    let server = MockServer::start().await;
    mount_token_response(&server, json!({"error": "authorization_pending"}), 400).await;

    let result = nightbot_auth(&server)
        .poll_device_code(&active_session(5))
        .await
        .expect("pending");

    assert!(matches!(result, DeviceCodePoll::Pending));
}

#[tokio::test]
async fn poll_slow_down_adds_five_seconds() {
    let server = MockServer::start().await;
    mount_token_response(&server, json!({"error": "slow_down"}), 400).await;

    let result = nightbot_auth(&server)
        .poll_device_code(&active_session(5))
        .await
        .expect("slow down");

    assert!(matches!(result, DeviceCodePoll::SlowDown { interval_secs: 10 }));
}

#[tokio::test]
async fn poll_slow_down_prefers_server_interval() {
    let server = MockServer::start().await;
    mount_token_response(&server, json!({"error": "slow_down", "interval": 15}), 400).await;

    let result = nightbot_auth(&server)
        .poll_device_code(&active_session(5))
        .await
        .expect("slow down");

    assert!(matches!(result, DeviceCodePoll::SlowDown { interval_secs: 15 }));
}

#[tokio::test]
async fn poll_denied_and_expired() {
    let server = MockServer::start().await;
    mount_token_response(&server, json!({"error": "access_denied"}), 400).await;
    let denied = nightbot_auth(&server)
        .poll_device_code(&active_session(5))
        .await
        .expect("denied");
    assert!(matches!(denied, DeviceCodePoll::AccessDenied));

    let server = MockServer::start().await;
    mount_token_response(&server, json!({"error": "expired_token"}), 400).await;
    let expired = nightbot_auth(&server)
        .poll_device_code(&active_session(5))
        .await
        .expect("expired");
    assert!(matches!(expired, DeviceCodePoll::Expired));
}

#[tokio::test]
async fn poll_past_expiry_skips_the_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let stale = DeviceCodeSession {
        expires_at: Utc::now() - Duration::seconds(1),
        ..active_session(5)
    };

    let result = nightbot_auth(&server)
        .poll_device_code(&stale)
        .await
        .expect("expired");

    assert!(matches!(result, DeviceCodePoll::Expired));
}

#[tokio::test]
async fn poll_authorized_returns_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("device_code=device-code-1"))
        .and(body_string_contains(
            "grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Adevice_code",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-1",
            "refresh_token": "refresh-1",
            "token_type": "bearer",
            "expires_in": 2592000,
            "scope": "song_requests song_requests_queue"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = nightbot_auth(&server)
        .poll_device_code(&active_session(5))
        .await
        .expect("authorized");

    match result {
        DeviceCodePoll::Authorized { token } => {
            assert_eq!(token.access_token, "access-1");
            assert_eq!(token.refresh_token.as_deref(), Some("refresh-1"));
            assert!(token.expires_at.expect("expiry") > Utc::now() + Duration::days(29));
            assert_eq!(
                token.scopes,
                Some(vec!["song_requests".to_string(), "song_requests_queue".to_string()])
            );
        }
        other => panic!("expected Authorized, got {other:?}"),
    }
}

#[tokio::test]
async fn unrepresentable_token_lifetime_leaves_expiry_unset() {
    let server = MockServer::start().await;
    mount_token_response(
        &server,
        json!({"access_token": "access-1", "expires_in": 10_000_000_000_000u64}),
        200,
    )
    .await;

    let auth = nightbot_auth(&server);
    let session = active_session(5);
    let result = tokio::spawn(async move { auth.poll_device_code(&session).await })
        .await
        .expect("poll task panicked")
        .expect("authorized");

    match result {
        DeviceCodePoll::Authorized { token } => {
            assert_eq!(token.access_token, "access-1");
            assert_eq!(token.expires_at, None);
        }
        other => panic!("expected Authorized, got {other:?}"),
    }
}

#[tokio::test]
async fn unrepresentable_device_code_lifetime_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/device/code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "device_code": "device-123",
            "user_code": "ABCD-EFGH",
            "verification_uri": "https://nightbot.tv/oauth2/device",
            "expires_in": u64::MAX,
            "interval": 5
        })))
        .mount(&server)
        .await;

    let result = nightbot_auth(&server).start_device_code().await;

    assert!(matches!(result, Err(AuthError::InvalidResponse(_))));
}

#[tokio::test]
async fn session_survives_an_oversized_token_lifetime() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/device/code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "device_code": "device-123",
            "user_code": "WXYZ-1234",
            "verification_uri": "https://nightbot.tv/oauth2/device",
            "expires_in": 30,
            "interval": 1
        })))
        .mount(&server)
        .await;
    mount_token_response(
        &server,
        json!({"access_token": "access-1", "expires_in": 10_000_000_000_000u64}),
        200,
    )
    .await;

    let tokens = Arc::new(TokenStore::new());
    let events = EventBus::new();
    let session = AuthSession::new(Arc::new(nightbot_auth(&server)), Arc::clone(&tokens), events.clone());
    let mut rx = events.subscribe();

    session.authenticate().await.expect("authenticate");
    let completed = support::wait_for(&mut rx, |e| matches!(e, SrEvent::AuthCompleted { .. })).await;

    assert_eq!(completed, SrEvent::AuthCompleted { success: true });
    assert_eq!(session.state(), AuthState::Authenticated);
    assert_eq!(tokens.get_token(), "access-1");
}

#[tokio::test]
async fn unknown_error_code_is_invalid_response() {
    let server = MockServer::start().await;
    mount_token_response(&server, json!({"error": "invalid_grant"}), 400).await;

    let result = nightbot_auth(&server)
        .poll_device_code(&active_session(5))
        .await;

    assert!(matches!(result, Err(AuthError::InvalidResponse(_))));
}

#[tokio::test]
async fn session_signs_in_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/device/code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "device_code": "device-123",
            "user_code": "WXYZ-1234",
            "verification_uri": "https://nightbot.tv/oauth2/device",
            "expires_in": 30,
            "interval": 1
        })))
        .expect(1)
        .mount(&server)
        .await;
    // Two pending answers, then the token.
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "authorization_pending"})),
        )
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-1",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = Arc::new(TokenStore::new());
    let events = EventBus::new();
    let session = AuthSession::new(Arc::new(nightbot_auth(&server)), Arc::clone(&tokens), events.clone());
    let mut rx = events.subscribe();

    let started = session.authenticate().await.expect("authenticate");
    match started {
        AuthStart::Started(device) => assert_eq!(device.user_code, "WXYZ-1234"),
        other => panic!("expected Started, got {other:?}"),
    }
    assert!(matches!(session.state(), AuthState::Pending { .. }));

    let completed = support::wait_for(&mut rx, |e| matches!(e, SrEvent::AuthCompleted { .. })).await;

    assert_eq!(completed, SrEvent::AuthCompleted { success: true });
    assert_eq!(session.state(), AuthState::Authenticated);
    assert_eq!(tokens.get_token(), "access-1");
    assert!(matches!(
        session.authenticate().await.expect("second call"),
        AuthStart::AlreadyAuthenticated
    ));
}
