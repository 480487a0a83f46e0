//! HTTP access to the asset host.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, RANGE};
use reqwest::Client;
use thiserror::Error;

/// Errors from a single HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    #[error("Failed to read response body: {0}")]
    Body(String),
}

impl TransportError {
    /// Transient failures are worth another attempt; definitive answers
    /// (4xx other than 429) are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Timeout(_)
            | TransportError::Connection(_)
            | TransportError::Body(_) => true,
            TransportError::Status(code) => *code >= 500 || *code == 429,
        }
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else if err.is_body() || err.is_decode() {
            TransportError::Body(err.to_string())
        } else {
            TransportError::Connection(err.to_string())
        }
    }
}

/// Status and leading bytes of a ranged request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
    pub head: Vec<u8>,
}

/// Transport to the asset host. Implemented over HTTP in production and by
/// in-memory fakes in tests.
#[async_trait]
pub trait AssetTransport: Send + Sync {
    /// Requests the first `max_bytes` of `url`. Any HTTP status is returned as
    /// `Ok`; only network-level failures are errors.
    async fn probe(&self, url: &str, max_bytes: u64) -> Result<ProbeResponse, TransportError>;

    /// Downloads the full body of `url`; non-success statuses are errors.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError>;
}

/// reqwest-backed transport with separate probe and download timeouts.
pub struct HttpTransport {
    client: Client,
    probe_timeout: Duration,
    download_timeout: Duration,
}

impl HttpTransport {
    /// Create a new transport.
    ///
    /// # Arguments
    /// * `user_agent` - User-Agent header sent with every request
    /// * `probe_timeout` - Timeout for ranged existence probes
    /// * `download_timeout` - Timeout for full downloads
    pub fn new(
        user_agent: &str,
        probe_timeout: Duration,
        download_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(TransportError::from_reqwest)?;

        Ok(Self {
            client,
            probe_timeout,
            download_timeout,
        })
    }
}

#[async_trait]
impl AssetTransport for HttpTransport {
    async fn probe(&self, url: &str, max_bytes: u64) -> Result<ProbeResponse, TransportError> {
        let range = format!("bytes=0-{}", max_bytes.saturating_sub(1));
        let range = HeaderValue::from_str(&range)
            .map_err(|e| TransportError::Connection(e.to_string()))?;
        let mut response = self
            .client
            .get(url)
            .header(RANGE, range)
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;

        let status = response.status().as_u16();
        // Hosts may ignore the range header; stop reading once we have enough.
        let mut head = Vec::new();
        while (head.len() as u64) < max_bytes {
            match response.chunk().await.map_err(TransportError::from_reqwest)? {
                Some(chunk) => head.extend_from_slice(&chunk),
                None => break,
            }
        }
        head.truncate(max_bytes as usize);

        Ok(ProbeResponse { status, head })
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        let response = self
            .client
            .get(url)
            .timeout(self.download_timeout)
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;

        if !response.status().is_success() {
            return Err(TransportError::Status(response.status().as_u16()));
        }

        let bytes = response.bytes().await.map_err(TransportError::from_reqwest)?;
        Ok(bytes.to_vec())
    }
}
