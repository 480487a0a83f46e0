use std::path::{Path, PathBuf};

use tracing::info;

use super::processor::SongOutcome;
use crate::transport::ThrottleStats;

/// Totals reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub songs: usize,
    /// Chart files written.
    pub saved: usize,
    pub skipped: usize,
    /// Songs without an English title anywhere.
    pub metadata_missing: Vec<u32>,
    /// Songs whose processing hit a local IO error.
    pub errored: Vec<u32>,
    /// Songs with entries in this run's failure ledger.
    pub failed_ids: Vec<u32>,
    pub ledger_path: Option<PathBuf>,
    pub downloads: ThrottleStats,
}

impl RunSummary {
    pub(super) fn add(&mut self, song_id: u32, outcome: &SongOutcome) {
        self.songs += 1;
        match outcome {
            SongOutcome::Processed { saved } => self.saved += saved,
            SongOutcome::Skipped(_) => self.skipped += 1,
            SongOutcome::MetadataMissing => self.metadata_missing.push(song_id),
        }
    }

    pub(super) fn add_error(&mut self, song_id: u32) {
        self.songs += 1;
        self.errored.push(song_id);
    }

    pub fn log(&self, record_path: &Path, dry_run: bool) {
        info!(
            "Done: {} songs, {} chart files saved ({} bytes downloaded)",
            self.songs, self.saved, self.downloads.bytes
        );
        info!("Songs with missing metadata: {:?}", self.metadata_missing);
        if !self.errored.is_empty() {
            info!("Songs aborted by local errors: {:?}", self.errored);
        }
        info!("Songs written to the failure ledger: {:?}", self.failed_ids);
        if let Some(path) = &self.ledger_path {
            info!("Failure ledger: {:?}", path);
        }
        if dry_run {
            info!("Dry run: no files written, record not updated");
        } else {
            info!("Record updated: {:?}", record_path);
        }
    }
}
