mod file_config;
mod song_ids;

pub use file_config::FileConfig;
pub use song_ids::{default_song_ids, parse_song_ids, resolve_song_ids};

use crate::catalog::DEFAULT_CATALOG_URL;
use crate::transport::DEFAULT_ASSETS_BASE_URL;
use anyhow::{bail, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub output_dir: PathBuf,
    pub region: String,
    pub probe_timeout_secs: u64,
    pub download_timeout_secs: u64,
    pub retries: u32,
    pub print_urls: bool,
    pub no_probe: bool,
    pub dry_run: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output/musicscore"),
            region: "cn".to_string(),
            probe_timeout_secs: 6,
            download_timeout_secs: 25,
            retries: 2,
            print_urls: false,
            no_probe: false,
            dry_run: false,
        }
    }
}

/// What a run is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Verify candidates over the network before accepting them.
    pub probe: bool,
    /// Resolve every declared difficulty and log its URL, even when already saved.
    pub print_urls: bool,
    /// No downloads and no writes of any kind.
    pub dry_run: bool,
}

impl RunOptions {
    /// Dry runs never probe so they cannot stall on probe timeouts.
    pub fn from_flags(print_urls: bool, no_probe: bool, dry_run: bool) -> Self {
        Self {
            probe: !(no_probe || dry_run),
            print_urls,
            dry_run,
        }
    }

    /// Failures are only classified on the real download path; probe-only and
    /// unverified resolutions cannot check content.
    pub fn records_resolution_failures(&self) -> bool {
        self.probe && !self.print_urls && !self.dry_run
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::from_flags(false, false, false)
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub output_dir: PathBuf,
    pub region: String,
    pub assets_base_url: String,
    pub catalog_url: String,
    pub options: RunOptions,
    pub transport: TransportSettings,
    pub resolver: ResolverSettings,
    pub download_delay_ms: u64,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let output_dir = file
            .output_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| cli.output_dir.clone());
        if output_dir.exists() && !output_dir.is_dir() {
            bail!("output_dir is not a directory: {:?}", output_dir);
        }

        let region = file.region.unwrap_or_else(|| cli.region.clone());
        if region.trim().is_empty() || region.contains('/') {
            bail!("Invalid region: {:?}", region);
        }

        let assets_base_url = file
            .assets_base_url
            .unwrap_or_else(|| DEFAULT_ASSETS_BASE_URL.to_string());
        let catalog_url = file
            .catalog_url
            .unwrap_or_else(|| DEFAULT_CATALOG_URL.to_string());

        let defaults = TransportSettings::default();
        let transport = TransportSettings {
            user_agent: file.user_agent.unwrap_or(defaults.user_agent),
            probe_timeout_secs: file.probe_timeout_secs.unwrap_or(cli.probe_timeout_secs),
            download_timeout_secs: file
                .download_timeout_secs
                .unwrap_or(cli.download_timeout_secs),
            retries: file.retries.unwrap_or(cli.retries),
            initial_backoff_ms: file
                .initial_backoff_ms
                .unwrap_or(defaults.initial_backoff_ms),
            max_backoff_ms: file.max_backoff_ms.unwrap_or(defaults.max_backoff_ms),
            backoff_multiplier: file
                .backoff_multiplier
                .unwrap_or(defaults.backoff_multiplier),
        };
        if transport.backoff_multiplier < 1.0 {
            bail!(
                "backoff_multiplier must be at least 1.0, got {}",
                transport.backoff_multiplier
            );
        }

        let resolver_defaults = ResolverSettings::default();
        let resolver = ResolverSettings {
            html_retry_attempts: file
                .html_retry_attempts
                .unwrap_or(resolver_defaults.html_retry_attempts),
            html_retry_backoff_ms: file
                .html_retry_backoff_ms
                .unwrap_or(resolver_defaults.html_retry_backoff_ms),
            probe_range_bytes: resolver_defaults.probe_range_bytes,
        };

        Ok(Self {
            output_dir,
            region,
            assets_base_url,
            catalog_url,
            options: RunOptions::from_flags(cli.print_urls, cli.no_probe, cli.dry_run),
            transport,
            resolver,
            download_delay_ms: file.download_delay_ms.unwrap_or(200),
        })
    }

    /// Cumulative per-song record, shared by all runs for the region.
    pub fn record_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("_downloaded_songs_{}.json", self.region))
    }

    /// Failure ledger of one run, stamped `YYYYmmdd_HHMMSS`.
    pub fn ledger_path(&self, stamp: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_{}.json", ledger_prefix(&self.region), stamp))
    }

    pub fn download_delay(&self) -> Duration {
        Duration::from_millis(self.download_delay_ms)
    }
}

/// Filename prefix shared by all ledger files of a region.
pub fn ledger_prefix(region: &str) -> String {
    format!("_failures_{}", region)
}

#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub user_agent: String,
    pub probe_timeout_secs: u64,
    pub download_timeout_secs: u64,
    pub retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
}

impl TransportSettings {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            probe_timeout_secs: 6,
            download_timeout_secs: 25,
            retries: 2,
            initial_backoff_ms: 600,
            max_backoff_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolverSettings {
    /// Extra fetches of a high-confidence candidate that came back as HTML.
    pub html_retry_attempts: u32,
    /// Backoff before the first extra fetch; doubles each time.
    pub html_retry_backoff_ms: u64,
    /// Bytes requested by an existence probe.
    pub probe_range_bytes: u64,
}

impl ResolverSettings {
    /// Settings without any waiting, for tests.
    pub fn immediate() -> Self {
        Self {
            html_retry_backoff_ms: 0,
            ..Default::default()
        }
    }

    pub fn html_retry_backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.html_retry_backoff_ms.saturating_mul(1 << attempt.min(16)))
    }
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            html_retry_attempts: 2,
            html_retry_backoff_ms: 800,
            probe_range_bytes: 8192,
        }
    }
}
