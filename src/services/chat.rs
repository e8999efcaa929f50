use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::models::{ChatRequest, ChatResponse, ErrorBody};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// Overlapping sends are refused outright.
    #[error("a chat request is already in flight")]
    Busy,

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx reply. `detail` carries the backend's own wording when the
    /// body had one.
    #[error("{detail}")]
    Backend { status: u16, detail: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Anything that can answer a chat request: the HTTP client in production,
/// scripted doubles in tests.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError>;

    /// True while a request is outstanding. Callers can pre-check instead
    /// of consuming input that `send` would refuse anyway.
    fn is_busy(&self) -> bool {
        false
    }
}

/// HTTP chat client with an at-most-one-in-flight policy.
///
/// A second `send` while one is outstanding fails fast with
/// [`ChatError::Busy`] instead of queueing.
pub struct ChatClient {
    http: reqwest::Client,
    endpoint: String,
    in_flight: AtomicBool,
}

impl ChatClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, ChatError> {
        Self::with_timeout(endpoint, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(
        endpoint: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            in_flight: AtomicBool::new(false),
        })
    }

    async fn dispatch(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError> {
        debug!(endpoint = %self.endpoint, query = %request.query, "sending chat request");

        let response = self.http.post(&self.endpoint).json(request).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = error_detail(status.as_u16(), &body);
            warn!(status = status.as_u16(), %detail, "chat request rejected");
            return Err(ChatError::Backend { status: status.as_u16(), detail });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ChatError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl ChatBackend for ChatClient {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ChatError::Busy);
        }
        let _guard = InFlightGuard(&self.in_flight);
        self.dispatch(request).await
    }

    fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Releases the in-flight flag on every exit path, cancellation included.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Error text for a failed request: the body's `detail` field when it
/// parses, a generic line otherwise.
fn error_detail(status: u16, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.detail)
        .unwrap_or_else(|| format!("Backend returned status {status}"))
}
