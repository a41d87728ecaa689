//! Transport trait and implementations for posting a form to the prediction endpoint.
//!
//! `HttpTransport` issues exactly one multipart POST per call and feeds the
//! body to the JSON decoder whatever the status code. `MockTransport` serves
//! queued replies for tests and dry runs.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::config::EndpointConfig;
use crate::error::{ConfigError, SubmitError};
use crate::payload::FormPayload;
use crate::response::PredictionResponse;

/// Trait for anything that can carry one submission to the prediction endpoint.
#[async_trait]
pub trait PredictionTransport: Send + Sync {
    /// Send the payload and decode the reply.
    async fn submit(&self, payload: &FormPayload) -> Result<PredictionResponse, SubmitError>;

    /// Endpoint description for logging.
    fn endpoint(&self) -> &str;
}

/// HTTP transport backed by `reqwest`.
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    /// Create a transport for the configured endpoint.
    pub fn new(config: &EndpointConfig) -> Result<Self, ConfigError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(|e| ConfigError::Invalid {
            message: format!("failed to build HTTP client: {e}"),
        })?;
        Ok(Self {
            client,
            url: config.predict_url(),
        })
    }

    /// Use an existing client, e.g. one shared with other components.
    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl PredictionTransport for HttpTransport {
    async fn submit(&self, payload: &FormPayload) -> Result<PredictionResponse, SubmitError> {
        let form = payload.to_multipart()?;

        // No extra headers: reqwest sets the multipart content type and boundary.
        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| SubmitError::Transport {
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| SubmitError::Transport {
            message: e.to_string(),
        })?;
        debug!(
            url = %self.url,
            status = status.as_u16(),
            bytes = body.len(),
            "Prediction endpoint replied"
        );

        PredictionResponse::from_slice(&body)
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}

/// What a queued mock reply resolves to.
#[derive(Debug, Clone)]
pub enum MockBody {
    /// A well-formed JSON reply.
    Json(PredictionResponse),
    /// Raw body bytes, run through the real decoder.
    Raw(Vec<u8>),
    /// The request itself fails.
    Fail(SubmitError),
}

/// One queued reply and how long it takes to resolve.
#[derive(Debug, Clone)]
pub struct MockReply {
    pub body: MockBody,
    pub delay: Duration,
}

impl MockReply {
    pub fn json(response: PredictionResponse) -> Self {
        Self {
            body: MockBody::Json(response),
            delay: Duration::ZERO,
        }
    }

    pub fn raw(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: MockBody::Raw(body.into()),
            delay: Duration::ZERO,
        }
    }

    pub fn fail(err: SubmitError) -> Self {
        Self {
            body: MockBody::Fail(err),
            delay: Duration::ZERO,
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// A mock transport for testing.
pub struct MockTransport {
    replies: Mutex<VecDeque<MockReply>>,
    received: Mutex<Vec<FormPayload>>,
    call_count: AtomicUsize,
}

impl MockTransport {
    /// Create a mock that fails every call (no replies queued).
    pub fn new() -> Self {
        Self::with_replies(Vec::new())
    }

    /// Create a mock with pre-configured replies, served in order.
    pub fn with_replies(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            received: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn push_reply(&self, reply: MockReply) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
    }

    /// Number of times `submit` was called.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Every payload received, in call order.
    pub fn received(&self) -> Vec<FormPayload> {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PredictionTransport for MockTransport {
    async fn submit(&self, payload: &FormPayload) -> Result<PredictionResponse, SubmitError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(payload.clone());

        // Dequeue before sleeping so overlapping calls get replies in call order.
        let reply = self
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let Some(reply) = reply else {
            return Err(SubmitError::Transport {
                message: "no mock replies queued".into(),
            });
        };

        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }
        match reply.body {
            MockBody::Json(response) => Ok(response),
            MockBody::Raw(bytes) => PredictionResponse::from_slice(&bytes),
            MockBody::Fail(err) => Err(err),
        }
    }

    fn endpoint(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_serves_replies_in_order() {
        let mock = MockTransport::with_replies(vec![
            MockReply::json(PredictionResponse::predicted("approved")),
            MockReply::json(PredictionResponse::predicted("denied")),
        ]);
        let payload = FormPayload::new().with_text("age", "40");

        let r1 = mock.submit(&payload).await.unwrap();
        assert_eq!(r1.prediction.as_deref(), Some("approved"));
        let r2 = mock.submit(&payload).await.unwrap();
        assert_eq!(r2.prediction.as_deref(), Some("denied"));
        assert_eq!(mock.call_count(), 2);
        assert_eq!(mock.received().len(), 2);
    }

    #[tokio::test]
    async fn test_mock_empty_returns_transport_error() {
        let mock = MockTransport::new();
        let err = mock.submit(&FormPayload::new()).await.unwrap_err();
        assert_eq!(err.kind(), "transport");
        assert!(err.to_string().contains("no mock replies queued"));
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_raw_body_goes_through_decoder() {
        let mock = MockTransport::with_replies(vec![MockReply::raw("Internal Server Error")]);
        let err = mock.submit(&FormPayload::new()).await.unwrap_err();
        assert!(matches!(err, SubmitError::Decode { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_delay() {
        let mock = MockTransport::with_replies(vec![
            MockReply::json(PredictionResponse::predicted("approved"))
                .after(Duration::from_millis(250)),
        ]);
        let start = tokio::time::Instant::now();
        mock.submit(&FormPayload::new()).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(250));
    }

    #[test]
    fn test_http_transport_url() {
        let transport = HttpTransport::new(&EndpointConfig::default()).unwrap();
        assert_eq!(transport.endpoint(), "http://127.0.0.1:5000/predict");

        let transport = HttpTransport::with_client(reqwest::Client::new(), "http://x/predict");
        assert_eq!(transport.endpoint(), "http://x/predict");
    }

    #[tokio::test]
    async fn test_http_transport_reports_payload_errors_before_sending() {
        let transport = HttpTransport::new(&EndpointConfig::default()).unwrap();
        let payload = FormPayload::new().with_field(
            "doc",
            crate::payload::FieldValue::file("d", "bad mime", vec![1]),
        );
        let err = transport.submit(&payload).await.unwrap_err();
        assert_eq!(err.kind(), "payload");
    }
}
