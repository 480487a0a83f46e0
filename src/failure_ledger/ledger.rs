use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::chart::Difficulty;
use crate::record_store::{write_atomic, DifficultyStatus};
use crate::timestamps::now_iso;

pub const LEDGER_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize ledger: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedDifficulty {
    pub status: DifficultyStatus,
    pub reason: String,
    pub url: Option<String>,
    pub failed_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureEntry {
    pub id: u32,
    pub title_en: Option<String>,
    pub title_jp: Option<String>,
    pub first_failed_at: String,
    pub updated_at: String,
    pub difficulties: BTreeMap<Difficulty, FailedDifficulty>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerFile {
    pub schema_version: u32,
    pub region: String,
    pub updated_at: String,
    pub failures: BTreeMap<String, FailureEntry>,
}

/// One run's log of terminally failed difficulties.
///
/// Created empty for every run and only ever written; nothing reads it back
/// to make resolution decisions. The file appears with the first entry.
pub struct FailureLedger {
    path: PathBuf,
    file: LedgerFile,
    enabled: bool,
}

impl FailureLedger {
    pub fn new(path: &Path, region: &str) -> Self {
        Self {
            path: path.to_path_buf(),
            file: LedgerFile {
                schema_version: LEDGER_SCHEMA_VERSION,
                region: region.to_string(),
                updated_at: now_iso(),
                failures: BTreeMap::new(),
            },
            enabled: true,
        }
    }

    /// Ledger that keeps entries in memory but never writes them.
    pub fn disabled(path: &Path, region: &str) -> Self {
        Self {
            enabled: false,
            ..Self::new(path, region)
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_empty(&self) -> bool {
        self.file.failures.is_empty()
    }

    pub fn entry(&self, song_id: u32) -> Option<&FailureEntry> {
        self.file.failures.get(&song_id.to_string())
    }

    /// Song ids with at least one entry, ascending.
    pub fn failed_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.file.failures.values().map(|e| e.id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Adds or replaces the entry for (`song_id`, `difficulty`) and rewrites
    /// the file.
    pub fn record(
        &mut self,
        song_id: u32,
        title_en: Option<&str>,
        title_jp: Option<&str>,
        difficulty: Difficulty,
        url: Option<&str>,
        reason: &str,
    ) -> Result<(), LedgerError> {
        let now = now_iso();
        let entry = self
            .file
            .failures
            .entry(song_id.to_string())
            .or_insert_with(|| FailureEntry {
                id: song_id,
                title_en: None,
                title_jp: None,
                first_failed_at: now.clone(),
                updated_at: now.clone(),
                difficulties: BTreeMap::new(),
            });
        entry.title_en = title_en.map(str::to_string);
        entry.title_jp = title_jp.map(str::to_string);
        entry.updated_at = now.clone();
        entry.difficulties.insert(
            difficulty,
            FailedDifficulty {
                status: DifficultyStatus::Failed,
                reason: reason.to_string(),
                url: url.map(str::to_string),
                failed_at: now,
            },
        );
        debug!("Ledger entry for {} {}: {}", song_id, difficulty, reason);
        self.persist()
    }

    fn persist(&mut self) -> Result<(), LedgerError> {
        if !self.enabled {
            return Ok(());
        }
        self.file.updated_at = now_iso();
        let json = serde_json::to_vec_pretty(&self.file)?;
        write_atomic(&self.path, &json)?;
        Ok(())
    }
}
