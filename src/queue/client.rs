use reqwest::Method;

use crate::auth::AuthSession;
use crate::config::SrConfig;
use crate::error::SrError;
use crate::events::{EventBus, SrEvent};
use crate::queue::model::{self, Queue, QueueSnapshot, PLAYLIST_USER};
use crate::transport::{ApiTransport, RequestBody};

const QUEUE_PATH: &str = "/1/song_requests/queue";
const SONG_REQUESTS_PATH: &str = "/1/song_requests";
const ME_PATH: &str = "/1/me";

/// Control endpoints under the queue resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueControl {
    Play,
    Pause,
    Skip,
}

impl QueueControl {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Skip => "skip",
        }
    }
}

/// Typed operations over the song-request queue.
///
/// No method returns a transport or parse error to its caller: failures are
/// logged and reported as an empty or default value. A 401 additionally signs
/// the attached [`AuthSession`] out.
#[derive(Clone)]
pub struct QueueClient {
    transport: ApiTransport,
    events: EventBus,
    api_url: String,
    playlist_label: String,
    session: Option<AuthSession>,
}

impl QueueClient {
    pub fn new(transport: ApiTransport, events: EventBus, api_url: impl Into<String>) -> Self {
        Self {
            transport,
            events,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            playlist_label: PLAYLIST_USER.to_string(),
            session: None,
        }
    }

    pub fn from_config(transport: ApiTransport, events: EventBus, config: &SrConfig) -> Self {
        Self::new(transport, events, config.api_url())
    }

    /// Session to invalidate when the API rejects the token.
    pub fn with_session(mut self, session: AuthSession) -> Self {
        self.session = Some(session);
        self
    }

    /// Requester label for playlist-filler tracks.
    pub fn with_playlist_label(mut self, label: impl Into<String>) -> Self {
        self.playlist_label = label.into();
        self
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_url)
    }

    /// GET the queue, publish the enabled flag (when present) and the snapshot.
    ///
    /// Any failure publishes and returns an empty queue.
    pub async fn fetch_queue(&self) -> Queue {
        let outcome = self
            .transport
            .execute(Method::GET, &self.url(QUEUE_PATH), RequestBody::None)
            .await;
        let snapshot = outcome
            .into_result()
            .and_then(|body| model::parse_queue(&body, &self.playlist_label));
        let snapshot = match snapshot {
            Ok(snapshot) => {
                tracing::debug!(entries = snapshot.queue.len(), "queue fetched");
                snapshot
            }
            Err(e) => {
                self.note_failure("fetch queue", &e);
                QueueSnapshot::default()
            }
        };
        if let Some(enabled) = snapshot.requests_enabled {
            self.events.publish(SrEvent::RequestsEnabled(enabled));
        }
        self.events
            .publish(SrEvent::QueueFetched(snapshot.queue.clone()));
        snapshot.queue
    }

    pub async fn control_play(&self) {
        self.control(QueueControl::Play).await;
    }

    pub async fn control_pause(&self) {
        self.control(QueueControl::Pause).await;
    }

    pub async fn control_skip(&self) {
        self.control(QueueControl::Skip).await;
    }

    /// POST an empty form to a control endpoint. The result is only logged.
    pub async fn control(&self, action: QueueControl) {
        let url = self.url(&format!("{QUEUE_PATH}/{}", action.as_str()));
        let result = self
            .transport
            .execute(Method::POST, &url, RequestBody::EmptyForm)
            .await
            .into_result();
        match result {
            Ok(_) => tracing::info!(action = action.as_str(), "queue control applied"),
            Err(e) => self.note_failure(action.as_str(), &e),
        }
    }

    /// DELETE one entry. An empty id sends nothing.
    pub async fn delete_song(&self, id: &str) {
        if id.is_empty() {
            tracing::warn!("delete requested without a song id");
            return;
        }
        let url = self.url(&format!("{QUEUE_PATH}/{id}"));
        match self
            .transport
            .execute(Method::DELETE, &url, RequestBody::None)
            .await
            .into_result()
        {
            Ok(_) => tracing::info!(id, "song removed from queue"),
            Err(e) => self.note_failure("delete song", &e),
        }
    }

    /// Move one entry to the front of the queue. An empty id sends nothing.
    pub async fn promote_song(&self, id: &str) {
        if id.is_empty() {
            tracing::warn!("promote requested without a song id");
            return;
        }
        let url = self.url(&format!("{QUEUE_PATH}/{id}/promote"));
        match self
            .transport
            .execute(Method::POST, &url, RequestBody::EmptyForm)
            .await
            .into_result()
        {
            Ok(_) => tracing::info!(id, "song promoted"),
            Err(e) => self.note_failure("promote song", &e),
        }
    }

    /// PUT the requests-enabled flag as JSON.
    pub async fn set_requests_enabled(&self, enabled: bool) {
        let body = RequestBody::Json(serde_json::json!({ "enabled": enabled }));
        match self
            .transport
            .execute(Method::PUT, &self.url(SONG_REQUESTS_PATH), body)
            .await
            .into_result()
        {
            Ok(_) => tracing::info!(enabled, "song requests toggled"),
            Err(e) => self.note_failure("toggle song requests", &e),
        }
    }

    /// GET the connected account's display name; empty on failure.
    pub async fn fetch_user_info(&self) -> String {
        let name = self
            .transport
            .execute(Method::GET, &self.url(ME_PATH), RequestBody::None)
            .await
            .into_result()
            .and_then(|body| model::parse_user_name(&body));
        let name = match name {
            Ok(name) => name,
            Err(e) => {
                self.note_failure("fetch user info", &e);
                String::new()
            }
        };
        self.events.publish(SrEvent::UserNameFetched(name.clone()));
        name
    }

    /// Submit a song request by search text or URL.
    ///
    /// Unlike the other operations the outcome is returned, and published as
    /// [`SrEvent::SongAdded`] with a message fit for showing inline. Blank
    /// queries are rejected without a request or event.
    pub async fn add_song(&self, query: &str) -> Result<String, SrError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SrError::InvalidInput("song query is empty".into()));
        }
        let body = RequestBody::Form(vec![("q".to_string(), query.to_string())]);
        let result = self
            .transport
            .execute(Method::POST, &self.url(QUEUE_PATH), body)
            .await
            .into_result();
        match result {
            Ok(body) => {
                let message = model::parse_added_title(&body)
                    .map(|title| format!("Added {title}"))
                    .unwrap_or_else(|| "Song added".to_string());
                tracing::info!(query, "song request added");
                self.events.publish(SrEvent::SongAdded {
                    success: true,
                    message: message.clone(),
                });
                Ok(message)
            }
            Err(e) => {
                self.note_failure("add song", &e);
                self.events.publish(SrEvent::SongAdded {
                    success: false,
                    message: e.user_message(),
                });
                Err(e)
            }
        }
    }

    fn note_failure(&self, operation: &str, error: &SrError) {
        match error {
            SrError::NoToken => tracing::debug!(operation, "skipped: not signed in"),
            _ => tracing::warn!(
                operation,
                category = ?error.category(),
                retryable = error.is_retryable(),
                error = %error,
                "queue operation failed"
            ),
        }
        if error.is_unauthorized() {
            if let Some(session) = &self.session {
                session.invalidate();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenStore;
    use std::sync::Arc;

    fn client(api_url: &str) -> QueueClient {
        let transport = ApiTransport::with_client(Arc::new(TokenStore::new()), reqwest::Client::new());
        QueueClient::new(transport, EventBus::new(), api_url)
    }

    #[test]
    fn trailing_slash_is_dropped_from_base_url() {
        let client = client("http://localhost:1234/");
        assert_eq!(client.url(QUEUE_PATH), "http://localhost:1234/1/song_requests/queue");
    }

    #[test]
    fn control_paths() {
        assert_eq!(QueueControl::Play.as_str(), "play");
        assert_eq!(QueueControl::Pause.as_str(), "pause");
        assert_eq!(QueueControl::Skip.as_str(), "skip");
    }

    #[tokio::test]
    async fn fetch_without_token_publishes_empty_queue() {
        let client = client("http://127.0.0.1:9");
        let mut rx = client.events().subscribe();

        let queue = client.fetch_queue().await;

        assert!(queue.is_empty());
        assert_eq!(rx.try_recv().unwrap(), SrEvent::QueueFetched(Queue::default()));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn blank_query_is_rejected_locally() {
        let client = client("http://127.0.0.1:9");
        let mut rx = client.events().subscribe();

        let result = client.add_song("   ").await;

        assert!(matches!(result, Err(SrError::InvalidInput(_))));
        assert!(rx.try_recv().is_err());
    }
}
