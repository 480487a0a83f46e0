use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Optional TOML configuration. Every present value overrides the CLI.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub output_dir: Option<String>,
    pub region: Option<String>,
    pub assets_base_url: Option<String>,
    pub catalog_url: Option<String>,
    pub user_agent: Option<String>,

    // Network
    pub probe_timeout_secs: Option<u64>,
    pub download_timeout_secs: Option<u64>,
    pub retries: Option<u32>,
    pub initial_backoff_ms: Option<u64>,
    pub max_backoff_ms: Option<u64>,
    pub backoff_multiplier: Option<f64>,

    // Resolution
    pub download_delay_ms: Option<u64>,
    pub html_retry_attempts: Option<u32>,
    pub html_retry_backoff_ms: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
