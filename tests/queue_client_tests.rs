mod support;

use nightbot_sr::auth::AuthState;
use nightbot_sr::error::SrError;
use nightbot_sr::events::SrEvent;
use nightbot_sr::queue::{Queue, QueueEntry};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn entry(id: &str, position: u32, title: &str, duration: u32, user: &str) -> QueueEntry {
    QueueEntry {
        id: id.into(),
        title: title.into(),
        submitted_by: user.into(),
        duration_secs: duration,
        position,
    }
}

#[tokio::test]
async fn fetch_merges_current_song_and_sorts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/1/song_requests/queue"))
        .respond_with(ResponseTemplate::new(200).set_body_json(support::queue_payload()))
        .expect(1)
        .mount(&server)
        .await;
    let h = support::harness(&server, true);
    let mut rx = h.events.subscribe();

    let queue = h.client.fetch_queue().await;

    let expected = Queue::new(vec![
        entry("a", 0, "X", 125, "playlist"),
        entry("c", 1, "Z", 30, "sue"),
        entry("b", 2, "Y", 60, "bob"),
    ]);
    assert_eq!(queue, expected);
    assert_eq!(
        support::drain(&mut rx),
        vec![SrEvent::RequestsEnabled(true), SrEvent::QueueFetched(expected)]
    );
}

#[tokio::test]
async fn unauthorized_fetch_empties_queue_and_signs_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/1/song_requests/queue"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "status": 401,
            "message": "Authorization failed"
        })))
        .expect(1)
        .mount(&server)
        .await;
    let h = support::harness(&server, true);
    let mut rx = h.events.subscribe();

    let queue = h.client.fetch_queue().await;

    assert!(queue.is_empty());
    assert_eq!(
        support::drain(&mut rx),
        vec![SrEvent::SessionExpired, SrEvent::QueueFetched(Queue::default())]
    );
    assert_eq!(h.session.state(), AuthState::Unauthenticated);
    assert!(!h.tokens.has_token());

    // Signed out now: the next fetch never reaches the server.
    let queue = h.client.fetch_queue().await;
    assert!(queue.is_empty());
}

#[tokio::test]
async fn server_error_empties_queue_but_keeps_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/1/song_requests/queue"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let h = support::harness(&server, true);

    let queue = h.client.fetch_queue().await;

    assert!(queue.is_empty());
    assert_eq!(h.session.state(), AuthState::Authenticated);
}

#[tokio::test]
async fn malformed_body_empties_queue() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/1/song_requests/queue"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;
    let h = support::harness(&server, true);
    let mut rx = h.events.subscribe();

    assert!(h.client.fetch_queue().await.is_empty());
    assert_eq!(
        support::drain(&mut rx),
        vec![SrEvent::QueueFetched(Queue::default())]
    );
}

#[tokio::test]
async fn controls_post_empty_forms() {
    let server = MockServer::start().await;
    for action in ["play", "pause", "skip"] {
        Mock::given(method("POST"))
            .and(path(format!("/1/song_requests/queue/{action}")))
            .and(header(
                "content-type",
                "application/x-www-form-urlencoded; charset=utf-8",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": 200})))
            .expect(1)
            .mount(&server)
            .await;
    }
    let h = support::harness(&server, true);

    h.client.control_play().await;
    h.client.control_pause().await;
    h.client.control_skip().await;
}

#[tokio::test]
async fn delete_and_promote_target_the_entry() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/1/song_requests/queue/abc"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/1/song_requests/queue/abc/promote"))
        .and(body_string(""))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    let h = support::harness(&server, true);

    h.client.delete_song("abc").await;
    h.client.promote_song("abc").await;
}

#[tokio::test]
async fn empty_id_sends_nothing() {
    let server = MockServer::start().await;
    let h = support::harness(&server, true);

    h.client.delete_song("").await;
    h.client.promote_song("").await;

    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn toggle_puts_json_flag() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/1/song_requests"))
        .and(body_json(json!({"enabled": true})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    let h = support::harness(&server, true);

    h.client.set_requests_enabled(true).await;
}

#[tokio::test]
async fn user_info_publishes_display_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/1/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 200,
            "user": {"_id": "u1", "name": "streamer", "displayName": "Streamer"}
        })))
        .mount(&server)
        .await;
    let h = support::harness(&server, true);
    let mut rx = h.events.subscribe();

    assert_eq!(h.client.fetch_user_info().await, "Streamer");
    assert_eq!(
        support::drain(&mut rx),
        vec![SrEvent::UserNameFetched("Streamer".into())]
    );
}

#[tokio::test]
async fn user_info_failure_yields_empty_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/1/me"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let h = support::harness(&server, true);

    assert_eq!(h.client.fetch_user_info().await, "");
}

#[tokio::test]
async fn add_song_reports_the_added_title() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/1/song_requests/queue"))
        .and(body_string("q=rick+astley"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 200,
            "item": {"_id": "n", "track": {"title": "Never Gonna Give You Up", "duration": 213}}
        })))
        .expect(1)
        .mount(&server)
        .await;
    let h = support::harness(&server, true);
    let mut rx = h.events.subscribe();

    let message = h.client.add_song("  rick astley ").await.expect("added");

    assert_eq!(message, "Added Never Gonna Give You Up");
    assert_eq!(
        support::drain(&mut rx),
        vec![SrEvent::SongAdded {
            success: true,
            message: "Added Never Gonna Give You Up".into()
        }]
    );
}

#[tokio::test]
async fn add_song_surfaces_the_rejection_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/1/song_requests/queue"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "status": 400,
            "message": "Song is longer than the maximum length"
        })))
        .mount(&server)
        .await;
    let h = support::harness(&server, true);
    let mut rx = h.events.subscribe();

    let result = h.client.add_song("a very long song").await;

    assert!(matches!(
        result,
        Err(SrError::RemoteRejected { status: 400, .. })
    ));
    assert_eq!(
        support::drain(&mut rx),
        vec![SrEvent::SongAdded {
            success: false,
            message: "Song is longer than the maximum length (400)".into()
        }]
    );
}

#[tokio::test]
async fn signed_out_client_sends_nothing() {
    let server = MockServer::start().await;
    let h = support::harness(&server, false);

    assert!(h.client.fetch_queue().await.is_empty());
    h.client.control_skip().await;
    assert_eq!(h.client.fetch_user_info().await, "");

    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}
