//! `reqwest`-backed production transport.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use crate::traits::transport::{Transport, TransportError, TransportResponse};

/// HTTP transport for real provider calls.
///
/// Carries its own client-level timeout as a safety net; the per-provider
/// attempt timeout is enforced above the transport by the strategy.
///
/// # Example
///
/// ```rust,ignore
/// use extraction_engine::transports::HttpTransport;
///
/// let transport = HttpTransport::new();
/// let strategy = BaseStrategy::new(registry, Arc::new(transport));
/// ```
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport {
    /// Create a transport with a 60s client-level timeout.
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(60))
    }

    /// Create a transport with a custom client-level timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client"),
            timeout,
        }
    }

    /// Use a preconfigured `reqwest` client (proxies, custom TLS, etc.).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &serde_json::Value,
    ) -> Result<TransportResponse, TransportError> {
        debug!(url = %url, "provider request starting");

        let mut request = self.client.post(url).header("Content-Type", "application/json");
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let response = request.json(body).send().await.map_err(|e| {
            warn!(url = %url, error = %e, "provider request failed");
            if e.is_timeout() {
                TransportError::Timeout(self.timeout)
            } else {
                TransportError::Connect(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        debug!(url = %url, status, bytes = body.len(), "provider response received");
        Ok(TransportResponse { status, body })
    }
}
