use std::collections::BTreeSet;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use super::{Pipeline, ProcessError, SpecialPolicy};
use crate::candidates::{infer_base_from_url, Candidate, CandidateGenerator};
use crate::catalog::is_placeholder_title;
use crate::chart::{validate, Difficulty};
use crate::record_store::{DifficultyStatus, SavedChart, SongRecord};
use crate::resolver::{Resolution, Verification};
use crate::transport::wait_for_turn;

const REASON_EXHAUSTED: &str = "no candidate had a valid chart header";
const REASON_DOWNLOAD: &str = "download failed";
const REASON_INVALID_DOWNLOAD: &str = "downloaded content has no chart header";
const NOTE_INVALID_DISCARDED: &str = "invalid content discarded";
const NOTE_NOT_FOUND: &str = "first candidate not found";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Id 0 or a site placeholder title.
    Placeholder,
    /// The title produced no candidate filename.
    NoCandidates,
    /// Every expected difficulty is already valid on disk.
    AllPresent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SongOutcome {
    Skipped(SkipReason),
    MetadataMissing,
    Processed { saved: usize },
}

/// Everything about a song that stays fixed while it is processed.
pub(super) struct SongContext {
    pub song_id: u32,
    pub title_en: String,
    pub title_jp: Option<String>,
    pub dir: PathBuf,
    /// `dir` as stored in the record.
    pub location: String,
    pub expected: BTreeSet<Difficulty>,
    pub policy: SpecialPolicy,
}

impl SongContext {
    /// Whether a miss on `difficulty` is a failure rather than `n/a`.
    pub fn records_failure(&self, difficulty: Difficulty) -> bool {
        difficulty != Difficulty::Special || self.policy.records_failures()
    }

    /// Song-level fields every record update carries.
    pub fn apply_song_fields(&self, record: &mut SongRecord) {
        record.set_titles(Some(&self.title_en), self.title_jp.as_deref());
        record.output_location = Some(self.location.clone());
        record.available_difficulties = self.expected.clone();
    }
}

/// A resolved candidate whose content still has to be downloaded.
struct Winner {
    difficulty: Difficulty,
    candidate: Candidate,
    url: String,
}

impl Pipeline {
    pub(super) async fn process_song(&mut self, song_id: u32) -> Result<SongOutcome, ProcessError> {
        if song_id == 0 {
            debug!("Skipping placeholder id 0");
            return Ok(SongOutcome::Skipped(SkipReason::Placeholder));
        }

        let entry = self.catalog.song(song_id).await;
        let recorded = self.store.song(song_id);
        let recorded_location = recorded.and_then(|r| r.output_location.clone());

        // Titles cached in the record win over the catalog.
        let (title_en, title_jp) = match recorded.and_then(|r| r.title_en.clone()) {
            Some(en) => (
                Some(en),
                recorded
                    .and_then(|r| r.title_jp.clone())
                    .or_else(|| entry.as_ref().and_then(|e| e.title_jp.clone())),
            ),
            None => (
                entry.as_ref().and_then(|e| e.title_en.clone()),
                entry.as_ref().and_then(|e| e.title_jp.clone()),
            ),
        };

        let Some(title_en) = title_en else {
            warn!("Song {}: metadata missing, skipping", song_id);
            return Ok(SongOutcome::MetadataMissing);
        };
        if is_placeholder_title(&title_en) {
            debug!("Song {}: placeholder title {:?}, skipping", song_id, title_en);
            return Ok(SongOutcome::Skipped(SkipReason::Placeholder));
        }

        let declared = entry.as_ref().and_then(|e| e.difficulties.clone());
        let policy = SpecialPolicy::from_declared(declared.as_ref());
        let expected: BTreeSet<Difficulty> =
            declared.unwrap_or_else(|| Difficulty::ALL.iter().copied().collect());
        let jackets = entry.map(|e| e.jacket_bases).unwrap_or_default();

        let generator = CandidateGenerator::new(song_id, &title_en, title_jp.as_deref(), jackets);
        if !generator.has_slugs() {
            warn!("Song {}: no usable filename from title {:?}", song_id, title_en);
            return Ok(SongOutcome::Skipped(SkipReason::NoCandidates));
        }

        let dir = self.library.song_dir(
            song_id,
            recorded_location.as_deref(),
            title_jp.as_deref(),
            Some(&title_en),
        )?;
        let ctx = SongContext {
            song_id,
            title_en,
            title_jp,
            location: self.library.relative_location(&dir),
            dir,
            expected,
            policy,
        };

        let satisfied = if self.options.dry_run {
            self.scan_local(&ctx)?
        } else {
            self.reconcile(&ctx)?
        };

        if !self.options.print_urls && ctx.expected.is_subset(&satisfied) {
            info!("Song {} ({}): all charts present", song_id, ctx.title_en);
            return Ok(SongOutcome::Skipped(SkipReason::AllPresent));
        }

        let mut to_resolve: Vec<Difficulty> = if self.options.print_urls {
            ctx.expected.iter().copied().collect()
        } else {
            ctx.expected.difference(&satisfied).copied().collect()
        };
        // One attempt at special even when the catalog leaves it out.
        if !self.options.print_urls
            && !to_resolve.contains(&Difficulty::Special)
            && !satisfied.contains(&Difficulty::Special)
        {
            to_resolve.push(Difficulty::Special);
        }

        let verification = if !self.options.probe {
            Verification::None
        } else if self.options.print_urls {
            Verification::ProbeOnly
        } else {
            Verification::Full
        };

        info!("Song {} ({}): resolving {:?}", song_id, ctx.title_en, to_resolve);

        let mut saved = 0;
        let mut winners = Vec::new();
        for difficulty in to_resolve {
            let inferred = self.inferred_bases(song_id, difficulty);
            let candidates = generator.generate(difficulty, &inferred);
            let stop_after_first_miss =
                difficulty == Difficulty::Special && !ctx.policy.records_failures();

            if verification == Verification::Full {
                wait_for_turn(self.throttler.as_ref()).await;
            }
            let resolution = self
                .resolver
                .resolve(song_id, difficulty, &candidates, verification, stop_after_first_miss)
                .await;

            match resolution {
                Resolution::Found {
                    candidate,
                    url,
                    content,
                } => {
                    if self.options.print_urls || self.options.dry_run {
                        if self.options.probe {
                            info!("{} {}: {}", song_id, difficulty, url);
                        } else {
                            info!("{} {}: {} (unverified)", song_id, difficulty, url);
                        }
                    }
                    match content {
                        Some(content) => {
                            if self.save(&ctx, difficulty, &candidate, &url, &content).await? {
                                saved += 1;
                            }
                        }
                        None => winners.push(Winner {
                            difficulty,
                            candidate,
                            url,
                        }),
                    }
                }
                Resolution::NotAvailable { last_url } => {
                    info!("{} {}: not available", song_id, difficulty);
                    if !self.options.dry_run && !self.options.print_urls {
                        self.mark_not_available(&ctx, difficulty, last_url, NOTE_NOT_FOUND)?;
                    }
                }
                Resolution::Exhausted { last_url } => {
                    if !self.options.records_resolution_failures() {
                        warn!("{} {}: no candidate confirmed", song_id, difficulty);
                    } else if ctx.records_failure(difficulty) {
                        warn!("{} {}: {}", song_id, difficulty, REASON_EXHAUSTED);
                        self.record_failure(&ctx, difficulty, last_url, REASON_EXHAUSTED)?;
                    } else {
                        info!("{} {}: not available", song_id, difficulty);
                        self.mark_not_available(&ctx, difficulty, last_url, REASON_EXHAUSTED)?;
                    }
                }
            }
        }

        if self.options.dry_run {
            return Ok(SongOutcome::Processed { saved: 0 });
        }

        for winner in winners {
            if satisfied.contains(&winner.difficulty) {
                continue;
            }
            wait_for_turn(self.throttler.as_ref()).await;
            match self.transport.fetch(&winner.url).await {
                Ok(content) => {
                    if self
                        .save(&ctx, winner.difficulty, &winner.candidate, &winner.url, &content)
                        .await?
                    {
                        saved += 1;
                    }
                }
                Err(e) => {
                    warn!("{} {}: download of {} failed: {}", song_id, winner.difficulty, winner.url, e);
                    self.fail_or_skip(&ctx, winner.difficulty, Some(winner.url), REASON_DOWNLOAD)?;
                }
            }
        }

        Ok(SongOutcome::Processed { saved })
    }

    /// Filename bases of siblings that are currently `ok`.
    fn inferred_bases(&self, song_id: u32, difficulty: Difficulty) -> Vec<String> {
        let mut bases: Vec<String> = Vec::new();
        if let Some(record) = self.store.song(song_id) {
            for (sibling, url) in record.ok_urls() {
                if sibling == difficulty {
                    continue;
                }
                if let Some(base) = infer_base_from_url(url, sibling) {
                    if !bases.contains(&base) {
                        bases.push(base);
                    }
                }
            }
        }
        bases
    }

    /// Writes a chart and marks it `ok`. Content without a chart header is
    /// discarded instead; returns whether a file was saved.
    async fn save(
        &mut self,
        ctx: &SongContext,
        difficulty: Difficulty,
        candidate: &Candidate,
        url: &str,
        content: &[u8],
    ) -> Result<bool, ProcessError> {
        if !validate(content).valid {
            warn!("{} {}: {} from {}", ctx.song_id, difficulty, REASON_INVALID_DOWNLOAD, url);
            self.library.remove_chart(&ctx.dir, difficulty)?;
            if ctx.records_failure(difficulty) {
                self.record_failure(ctx, difficulty, Some(url.to_string()), REASON_INVALID_DOWNLOAD)?;
            } else {
                self.store.update(ctx.song_id, |record| {
                    ctx.apply_song_fields(record);
                    record.mark_pending(difficulty, NOTE_INVALID_DISCARDED);
                })?;
            }
            return Ok(false);
        }

        let byte_size = self.library.write_chart(&ctx.dir, difficulty, content)?;
        let saved = SavedChart {
            file: difficulty.local_filename(),
            byte_size,
            source_tier: candidate.tier.into(),
            url: Some(url.to_string()),
        };
        self.store.update(ctx.song_id, |record| {
            ctx.apply_song_fields(record);
            record.mark_ok(difficulty, saved);
        })?;
        self.throttler.record_download(byte_size).await;
        info!(
            "{} {}: saved {} [{}] ({} bytes)",
            ctx.song_id, difficulty, candidate.filename, candidate.tier, byte_size
        );
        Ok(true)
    }

    /// `failed` plus a ledger entry, or `n/a` for a special chart nobody
    /// confirmed.
    fn fail_or_skip(
        &mut self,
        ctx: &SongContext,
        difficulty: Difficulty,
        url: Option<String>,
        reason: &str,
    ) -> Result<(), ProcessError> {
        if ctx.records_failure(difficulty) {
            self.record_failure(ctx, difficulty, url, reason)
        } else {
            self.mark_not_available(ctx, difficulty, url, reason)
        }
    }

    pub(super) fn record_failure(
        &mut self,
        ctx: &SongContext,
        difficulty: Difficulty,
        url: Option<String>,
        reason: &str,
    ) -> Result<(), ProcessError> {
        self.ledger.record(
            ctx.song_id,
            Some(&ctx.title_en),
            ctx.title_jp.as_deref(),
            difficulty,
            url.as_deref(),
            reason,
        )?;
        self.store.update(ctx.song_id, |record| {
            ctx.apply_song_fields(record);
            record.mark_failed(difficulty, url, reason);
        })?;
        Ok(())
    }

    /// Marks `n/a` unless it already is, for the same URL.
    fn mark_not_available(
        &mut self,
        ctx: &SongContext,
        difficulty: Difficulty,
        url: Option<String>,
        note: &str,
    ) -> Result<(), ProcessError> {
        let unchanged = self
            .store
            .song(ctx.song_id)
            .and_then(|r| r.state(difficulty))
            .map(|s| s.status == DifficultyStatus::NotAvailable && s.url == url)
            .unwrap_or(false);
        if unchanged {
            return Ok(());
        }
        self.store.update(ctx.song_id, |record| {
            ctx.apply_song_fields(record);
            record.mark_not_available(difficulty, url, note);
        })?;
        Ok(())
    }
}
