#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use score_fetcher::candidates::CandidateGenerator;
use score_fetcher::chart::{Difficulty, HEADER_MARKER};
use score_fetcher::config::{AppConfig, CliConfig, FileConfig, RunOptions};
use score_fetcher::pipeline::Pipeline;
use score_fetcher::transport::{AssetLocator, NoOpThrottler};
use tempfile::TempDir;

use super::constants::{ASSETS_BASE_URL, CATALOG_URL, REGION};
use super::fake_host::FakeHost;

/// A chart that passes validation.
pub fn chart_body(label: &str) -> Vec<u8> {
    let mut body = format!("{}\n", label).into_bytes();
    body.extend_from_slice(HEADER_MARKER);
    body.extend_from_slice(b"\n#BPM 180\n#00101:11\n");
    body
}

pub fn html_body() -> Vec<u8> {
    b"<!DOCTYPE html><html><body>Not here</body></html>".to_vec()
}

pub fn chart_url(song_id: u32, filename: &str) -> String {
    AssetLocator::new(ASSETS_BASE_URL, REGION).chart_url(song_id, filename)
}

/// URL of the first title-derived candidate, with no sibling or jacket hints.
pub fn first_candidate(song_id: u32, en: &str, jp: Option<&str>, difficulty: Difficulty) -> String {
    let generator = CandidateGenerator::new(song_id, en, jp, Vec::new());
    let candidates = generator.generate(difficulty, &[]);
    chart_url(song_id, &candidates[0].filename)
}

/// A temporary output root with configuration pointing at the fake host.
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub root: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("musicscore");
        Self { temp_dir, root }
    }

    pub fn config(&self, options: RunOptions) -> AppConfig {
        let cli = CliConfig {
            output_dir: self.root.clone(),
            region: REGION.to_string(),
            retries: 0,
            ..Default::default()
        };
        let file = FileConfig {
            assets_base_url: Some(ASSETS_BASE_URL.to_string()),
            catalog_url: Some(CATALOG_URL.to_string()),
            initial_backoff_ms: Some(0),
            download_delay_ms: Some(0),
            html_retry_backoff_ms: Some(0),
            ..Default::default()
        };
        let mut config = AppConfig::resolve(&cli, Some(file)).unwrap();
        config.options = options;
        config
    }

    pub fn pipeline(&self, host: &Arc<FakeHost>) -> Pipeline {
        self.pipeline_with(host, RunOptions::default())
    }

    pub fn pipeline_with(&self, host: &Arc<FakeHost>, options: RunOptions) -> Pipeline {
        Pipeline::from_config(
            &self.config(options),
            host.clone(),
            Arc::new(NoOpThrottler::new()),
        )
        .unwrap()
    }

    pub fn record_path(&self) -> PathBuf {
        self.config(RunOptions::default()).record_path()
    }

    pub fn song_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Writes a record file before the first run.
    pub fn seed_record(&self, songs: serde_json::Value) {
        std::fs::create_dir_all(&self.root).unwrap();
        let doc = serde_json::json!({
            "schemaVersion": 2,
            "region": REGION,
            "songs": songs,
        });
        std::fs::write(self.record_path(), serde_json::to_vec_pretty(&doc).unwrap()).unwrap();
    }

    pub fn seed_file(&self, path: &Path, body: &[u8]) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    pub fn read_record(&self) -> serde_json::Value {
        serde_json::from_slice(&std::fs::read(self.record_path()).unwrap()).unwrap()
    }
}
