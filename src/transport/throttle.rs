//! Polite spacing between downloads.
//!
//! The asset host rate-limits aggressive clients, so successful downloads are
//! kept a minimum interval apart whether they come from one loop or several.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Trait for download pacing.
#[async_trait]
pub trait DownloadThrottler: Send + Sync {
    /// Check if another download may start now.
    /// Returns Ok(()) if allowed, Err(wait_duration) if it should wait.
    async fn check_spacing(&self) -> Result<(), Duration>;

    /// Record that a download of `bytes` just completed.
    async fn record_download(&self, bytes: u64);

    /// Totals for the run summary.
    async fn get_stats(&self) -> ThrottleStats;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThrottleStats {
    /// Completed downloads
    pub downloads: u64,
    /// Bytes across all completed downloads
    pub bytes: u64,
}

#[derive(Debug, Default)]
struct ThrottleState {
    last_download: Option<Instant>,
    totals: ThrottleStats,
}

/// Enforces a fixed minimum delay after each download.
pub struct FixedDelayThrottler {
    state: Mutex<ThrottleState>,
    delay: Duration,
}

impl FixedDelayThrottler {
    pub fn new(delay: Duration) -> Self {
        Self {
            state: Mutex::new(ThrottleState::default()),
            delay,
        }
    }
}

#[async_trait]
impl DownloadThrottler for FixedDelayThrottler {
    async fn check_spacing(&self) -> Result<(), Duration> {
        let state = self.state.lock().await;
        match state.last_download {
            Some(last) => {
                let ready_at = last + self.delay;
                let now = Instant::now();
                if ready_at > now {
                    Err(ready_at - now)
                } else {
                    Ok(())
                }
            }
            None => Ok(()),
        }
    }

    async fn record_download(&self, bytes: u64) {
        let mut state = self.state.lock().await;
        state.last_download = Some(Instant::now());
        state.totals.downloads += 1;
        state.totals.bytes += bytes;
    }

    async fn get_stats(&self) -> ThrottleStats {
        self.state.lock().await.totals.clone()
    }
}

/// Never waits; still counts downloads.
#[derive(Default)]
pub struct NoOpThrottler {
    totals: Mutex<ThrottleStats>,
}

impl NoOpThrottler {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DownloadThrottler for NoOpThrottler {
    async fn check_spacing(&self) -> Result<(), Duration> {
        Ok(())
    }

    async fn record_download(&self, bytes: u64) {
        let mut totals = self.totals.lock().await;
        totals.downloads += 1;
        totals.bytes += bytes;
    }

    async fn get_stats(&self) -> ThrottleStats {
        self.totals.lock().await.clone()
    }
}

/// Sleeps until `throttler` allows the next download.
pub async fn wait_for_turn(throttler: &dyn DownloadThrottler) {
    while let Err(wait) = throttler.check_spacing().await {
        tokio::time::sleep(wait).await;
    }
}
