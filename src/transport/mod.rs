//! Access to the remote asset host.
//!
//! Layers, innermost first: [`AssetTransport`] (one HTTP exchange),
//! [`RetryingTransport`] (bounded retries with backoff), [`AssetLocator`]
//! (URL layout) and [`DownloadThrottler`] (spacing between downloads).

mod http_client;
mod locator;
mod retry_policy;
mod retrying;
mod throttle;

pub use http_client::{AssetTransport, HttpTransport, ProbeResponse, TransportError};
pub use locator::{encode_filename, AssetLocator, DEFAULT_ASSETS_BASE_URL};
pub use retry_policy::RetryPolicy;
pub use retrying::RetryingTransport;
pub use throttle::{
    wait_for_turn, DownloadThrottler, FixedDelayThrottler, NoOpThrottler, ThrottleStats,
};
