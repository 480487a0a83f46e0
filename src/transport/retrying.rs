use std::sync::Arc;

use tracing::debug;

use super::{AssetTransport, ProbeResponse, RetryPolicy, TransportError};

/// Wraps a transport with bounded retries for full fetches.
///
/// Probes are passed through untouched; a failed probe just means an
/// "unknown" verdict for one candidate.
#[derive(Clone)]
pub struct RetryingTransport {
    inner: Arc<dyn AssetTransport>,
    policy: RetryPolicy,
}

impl RetryingTransport {
    pub fn new(inner: Arc<dyn AssetTransport>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn probe(&self, url: &str, max_bytes: u64) -> Result<ProbeResponse, TransportError> {
        self.inner.probe(url, max_bytes).await
    }

    /// Fetches `url`, retrying transient failures with exponential backoff.
    /// Definitive failures (4xx) return immediately.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        let mut attempt = 0;
        loop {
            match self.inner.fetch(url).await {
                Ok(body) => return Ok(body),
                Err(err) if self.policy.should_retry(&err, attempt) => {
                    let backoff = self.policy.backoff(attempt);
                    debug!(
                        "Fetch of {} failed ({}), retry {} in {:?}",
                        url,
                        err,
                        attempt + 1,
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
