//! Aligning the record with the files actually on disk.

use std::collections::BTreeSet;

use tracing::{info, warn};

use super::processor::SongContext;
use super::{Pipeline, ProcessError};
use crate::chart::Difficulty;
use crate::library::LocalChart;
use crate::record_store::{DifficultyStatus, SavedChart, SourceTier};

const REASON_INVALID_ON_DISK: &str = "file on disk has no chart header";
const NOTE_INVALID_ON_DISK: &str = "invalid file on disk discarded";
const NOTE_MISSING_ON_DISK: &str = "recorded ok but missing on disk";
const NOTE_NOT_DECLARED: &str = "not declared by catalog";

#[derive(Debug)]
enum Fix {
    FoundOnDisk { byte_size: u64 },
    InvalidOnDisk { url: Option<String> },
    Pending(&'static str),
    NotDeclared,
}

impl Pipeline {
    /// Brings the song's record in line with its directory and returns the
    /// difficulties that already have a valid chart.
    ///
    /// Invalid files are deleted. Running this twice without disk changes
    /// leaves the record untouched the second time.
    pub(super) fn reconcile(
        &mut self,
        ctx: &SongContext,
    ) -> Result<BTreeSet<Difficulty>, ProcessError> {
        let mut satisfied = BTreeSet::new();
        let mut fixes = Vec::new();
        let record = self.store.song(ctx.song_id);

        for difficulty in Difficulty::ALL {
            let declared = ctx.expected.contains(&difficulty);
            let state = record.and_then(|r| r.state(difficulty));
            let status = state.map(|s| s.status).unwrap_or_default();

            let mut local = self.library.inspect(&ctx.dir, difficulty)?;
            if local == LocalChart::Invalid {
                warn!(
                    "{} {}: {}, deleting",
                    ctx.song_id, difficulty, REASON_INVALID_ON_DISK
                );
                self.library.remove_chart(&ctx.dir, difficulty)?;
                if declared {
                    let fix = if ctx.records_failure(difficulty) {
                        Fix::InvalidOnDisk {
                            url: state.and_then(|s| s.url.clone()),
                        }
                    } else {
                        Fix::Pending(NOTE_INVALID_ON_DISK)
                    };
                    fixes.push((difficulty, fix));
                    continue;
                }
                local = LocalChart::Missing;
            }

            match local {
                LocalChart::Valid { byte_size } => {
                    satisfied.insert(difficulty);
                    if status != DifficultyStatus::Ok {
                        fixes.push((difficulty, Fix::FoundOnDisk { byte_size }));
                    }
                }
                _ if !declared => {
                    if status != DifficultyStatus::NotAvailable {
                        fixes.push((difficulty, Fix::NotDeclared));
                    }
                }
                _ => {
                    if status == DifficultyStatus::Ok {
                        fixes.push((difficulty, Fix::Pending(NOTE_MISSING_ON_DISK)));
                    }
                }
            }
        }

        for (difficulty, fix) in &fixes {
            match fix {
                Fix::FoundOnDisk { .. } => {
                    info!("{} {}: valid chart on disk", ctx.song_id, difficulty)
                }
                Fix::Pending(note) => info!("{} {}: {}", ctx.song_id, difficulty, note),
                _ => {}
            }
        }

        let mut failed = Vec::new();
        self.store.update(ctx.song_id, |record| {
            ctx.apply_song_fields(record);
            for (difficulty, fix) in fixes {
                match fix {
                    Fix::FoundOnDisk { byte_size } => record.mark_ok(
                        difficulty,
                        SavedChart {
                            file: difficulty.local_filename(),
                            byte_size,
                            source_tier: SourceTier::Disk,
                            url: None,
                        },
                    ),
                    Fix::InvalidOnDisk { url } => {
                        record.mark_failed(difficulty, url.clone(), REASON_INVALID_ON_DISK);
                        failed.push((difficulty, url));
                    }
                    Fix::Pending(note) => record.mark_pending(difficulty, note),
                    Fix::NotDeclared => {
                        record.mark_not_available(difficulty, None, NOTE_NOT_DECLARED)
                    }
                }
            }
        })?;

        for (difficulty, url) in failed {
            self.ledger.record(
                ctx.song_id,
                Some(&ctx.title_en),
                ctx.title_jp.as_deref(),
                difficulty,
                url.as_deref(),
                REASON_INVALID_ON_DISK,
            )?;
        }

        Ok(satisfied)
    }

    /// Read-only variant for dry runs: which difficulties have a valid chart.
    pub(super) fn scan_local(
        &self,
        ctx: &SongContext,
    ) -> Result<BTreeSet<Difficulty>, ProcessError> {
        let mut satisfied = BTreeSet::new();
        for difficulty in Difficulty::ALL {
            if let LocalChart::Valid { .. } = self.library.inspect(&ctx.dir, difficulty)? {
                satisfied.insert(difficulty);
            }
        }
        Ok(satisfied)
    }
}
