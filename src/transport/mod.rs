//! Authenticated request executor and outcome classification.
//!
//! The transport attaches the bearer token, encodes the body and reports what
//! happened. It never retries and never reads response bodies beyond
//! collecting them.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;

use crate::auth::TokenStore;
use crate::config::SrConfig;
use crate::error::SrError;

/// Status reported when no HTTP response was obtained.
pub const TRANSPORT_FAILURE_STATUS: i32 = -1;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";
const JSON_CONTENT_TYPE: &str = "application/json";
const MAX_MESSAGE_LEN: usize = 200;

/// Request payload, encoded according to the endpoint's contract.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    None,
    /// Form content type with an empty body (control endpoints).
    EmptyForm,
    Form(Vec<(String, String)>),
    Json(serde_json::Value),
}

/// What came back from one request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    /// Any received status, including 4xx/5xx.
    Response { status: u16, body: Vec<u8> },
    /// No token was held; nothing was sent.
    NoToken,
    /// DNS, TLS, connect or timeout failure.
    Failed { reason: String },
}

impl RequestOutcome {
    /// Received status, or [`TRANSPORT_FAILURE_STATUS`].
    pub fn status_code(&self) -> i32 {
        match self {
            Self::Response { status, .. } => i32::from(*status),
            Self::NoToken | Self::Failed { .. } => TRANSPORT_FAILURE_STATUS,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Response { status, .. } if (200..300).contains(status))
    }

    pub fn body(&self) -> &[u8] {
        match self {
            Self::Response { body, .. } => body,
            Self::NoToken | Self::Failed { .. } => &[],
        }
    }

    /// Body of a 2xx response, or the classified error.
    pub fn into_result(self) -> Result<Vec<u8>, SrError> {
        match self {
            Self::Response { status, body } if (200..300).contains(&status) => Ok(body),
            Self::Response { status, body } => {
                Err(SrError::rejected(status, extract_message(&body)))
            }
            Self::NoToken => Err(SrError::NoToken),
            Self::Failed { reason } => Err(SrError::TransportFailure(reason)),
        }
    }
}

/// Executes one bearer-authenticated HTTP call.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use nightbot_sr::auth::TokenStore;
/// use nightbot_sr::config::SrConfig;
/// use nightbot_sr::transport::{ApiTransport, RequestBody};
///
/// # async fn example() -> nightbot_sr::error::Result<()> {
/// let transport = ApiTransport::new(Arc::new(TokenStore::new()), &SrConfig::new())?;
/// let outcome = transport
///     .execute(reqwest::Method::GET, "https://api.nightbot.tv/1/me", RequestBody::None)
///     .await;
/// println!("status {}", outcome.status_code());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ApiTransport {
    client: reqwest::Client,
    tokens: Arc<TokenStore>,
}

impl ApiTransport {
    pub fn new(tokens: Arc<TokenStore>, config: &SrConfig) -> Result<Self, SrError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .connect_timeout(Duration::from_secs(5).min(config.http_timeout()))
            .pool_max_idle_per_host(4)
            .user_agent(concat!("nightbot-sr/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SrError::Configuration(format!("cannot build HTTP client: {e}")))?;
        Ok(Self::with_client(tokens, client))
    }

    pub fn with_client(tokens: Arc<TokenStore>, client: reqwest::Client) -> Self {
        Self { client, tokens }
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    pub async fn execute(&self, method: Method, url: &str, body: RequestBody) -> RequestOutcome {
        let token = self.tokens.get_token();
        if token.is_empty() {
            tracing::warn!(%method, url, "request attempted without an access token");
            return RequestOutcome::NoToken;
        }
        let Ok(bearer) = HeaderValue::from_str(&format!("Bearer {token}")) else {
            tracing::error!("access token is not a valid header value");
            return RequestOutcome::NoToken;
        };

        let mut request = self
            .client
            .request(method.clone(), url)
            .header(AUTHORIZATION, bearer);
        request = match body {
            RequestBody::None => request,
            RequestBody::EmptyForm => request
                .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
                .body(Vec::new()),
            RequestBody::Form(fields) => request
                .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
                .body(encode_form(&fields)),
            RequestBody::Json(value) => request
                .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
                .body(value.to_string()),
        };

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(%method, url, error = %e, "request failed");
                return RequestOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };
        let status = response.status().as_u16();
        match response.bytes().await {
            Ok(bytes) => {
                tracing::debug!(%method, url, status, "request completed");
                RequestOutcome::Response {
                    status,
                    body: bytes.to_vec(),
                }
            }
            Err(e) => {
                tracing::warn!(%method, url, status, error = %e, "reading response body failed");
                RequestOutcome::Response {
                    status,
                    body: Vec::new(),
                }
            }
        }
    }
}

fn encode_form(fields: &[(String, String)]) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in fields {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

/// Pull a human-readable reason out of an error body.
fn extract_message(body: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        if let Some(message) = value
            .get("message")
            .or_else(|| value.get("error_description"))
            .or_else(|| value.get("error"))
            .and_then(|m| m.as_str())
        {
            return message.to_string();
        }
    }
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    match text.char_indices().nth(MAX_MESSAGE_LEN) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
