//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that use the engine without
//! making real provider calls: the [`MockTransport`] replays a scripted
//! sequence of responses and records every request it receives.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use crate::traits::transport::{Transport, TransportError, TransportResponse};
use crate::types::config::{AuthScheme, ProviderConfig};

/// Record of one request the mock received.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: serde_json::Value,
}

/// A scripted transport for tests.
///
/// Responses are consumed in order, one per call; when the script runs dry
/// the mock fails with a connect error so an unexpected extra call shows up
/// as a loud test failure rather than a silent success.
///
/// # Example
///
/// ```rust,ignore
/// let transport = MockTransport::new()
///     .with_response(500, "overloaded")
///     .with_chat_json(serde_json::json!({"price": 19.99}));
/// ```
#[derive(Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<Result<TransportResponse, TransportError>>>,
    calls: Arc<RwLock<Vec<MockCall>>>,
}

impl MockTransport {
    /// Create a mock with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a raw response with the given status and body.
    pub fn with_response(self, status: u16, body: impl Into<String>) -> Self {
        self.script.lock().unwrap().push_back(Ok(TransportResponse {
            status,
            body: body.into(),
        }));
        self
    }

    /// Script a 200 chat-completions response whose message content is the
    /// given JSON value.
    pub fn with_chat_json(self, content: serde_json::Value) -> Self {
        let body = chat_body(&content.to_string());
        self.with_response(200, body)
    }

    /// Script a 200 chat-completions response with arbitrary message text.
    pub fn with_chat_text(self, content: &str) -> Self {
        let body = chat_body(content);
        self.with_response(200, body)
    }

    /// Script a connection failure.
    pub fn with_connect_error(self, message: impl Into<String>) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Err(TransportError::Connect(message.into())));
        self
    }

    /// Script a transport-level timeout.
    pub fn with_timeout(self, after: Duration) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Err(TransportError::Timeout(after)));
        self
    }

    /// All requests received so far.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.read().unwrap().clone()
    }

    /// Number of requests received so far.
    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &serde_json::Value,
    ) -> Result<TransportResponse, TransportError> {
        self.calls.write().unwrap().push(MockCall {
            url: url.to_string(),
            headers: headers.to_vec(),
            body: body.clone(),
        });

        match self.script.lock().unwrap().pop_front() {
            Some(outcome) => outcome,
            None => Err(TransportError::Connect(
                "mock transport script exhausted".to_string(),
            )),
        }
    }
}

/// Wrap message content in a chat-completions envelope.
pub fn chat_body(content: &str) -> String {
    serde_json::json!({
        "choices": [{"message": {"role": "assistant", "content": content}}],
        "usage": {"prompt_tokens": 100, "completion_tokens": 20}
    })
    .to_string()
}

/// Provider config wired for tests: no auth, millisecond backoff.
pub fn test_provider(name: &str) -> ProviderConfig {
    ProviderConfig::new(name, format!("https://{name}.test/v1/chat"), "test-model")
        .with_auth(AuthScheme::None)
        .with_base_backoff(Duration::from_millis(1))
}
