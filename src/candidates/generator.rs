//! Builds the ordered list of remote filenames to try for one difficulty.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use super::overrides::asset_title_override;
use crate::chart::{Difficulty, CHART_EXTENSION};
use crate::titles::{is_legacy_id, pick_asset_title, slugify, titles_equal};

/// Where a candidate filename came from, highest confidence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateTier {
    /// Reuses the base of a sibling difficulty that already downloaded.
    Inferred,
    /// Forced per-song asset name.
    Override,
    /// Cover-art name hint from the catalog.
    Jacket,
    /// Derived from the song title.
    Slug,
}

impl CandidateTier {
    /// High-confidence names get a full fetch even when the probe says absent,
    /// and extra retries when the host answers with an HTML shell.
    pub fn is_high_confidence(&self) -> bool {
        !matches!(self, CandidateTier::Slug)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateTier::Inferred => "inferred",
            CandidateTier::Override => "override",
            CandidateTier::Jacket => "jacket",
            CandidateTier::Slug => "slug",
        }
    }
}

impl fmt::Display for CandidateTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub filename: String,
    pub tier: CandidateTier,
}

/// Per-song candidate builder.
///
/// Everything that does not depend on the difficulty (override, jacket hints,
/// slug variants) is computed once; [`CandidateGenerator::generate`] then only
/// appends suffixes.
#[derive(Debug, Clone)]
pub struct CandidateGenerator {
    song_id: u32,
    override_title: Option<String>,
    jacket_bases: Vec<String>,
    slugs: Vec<String>,
}

impl CandidateGenerator {
    pub fn new(
        song_id: u32,
        title_en: &str,
        title_jp: Option<&str>,
        jacket_bases: Vec<String>,
    ) -> Self {
        let override_title = asset_title_override(song_id)
            .map(|raw| raw.nfkc().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty());

        // The override doubles as the asset title, so its slug forms are tried
        // after the verbatim override itself.
        let asset_title = match &override_title {
            Some(title) => pick_asset_title(song_id, title, None),
            None => pick_asset_title(song_id, title_en, title_jp),
        };

        let mut slugs = Vec::new();
        for title in asset_title.variants() {
            slugs.extend(song_name_variants(title));
        }
        // A repeated title still falls back to the full English name when an
        // override replaced it.
        if override_title.is_some() && repeats_english_title(song_id, title_en, title_jp) {
            slugs.extend(song_name_variants(title_en));
        }

        Self {
            song_id,
            override_title,
            jacket_bases,
            slugs: dedup(slugs),
        }
    }

    /// False when the title produced no usable slug at all.
    pub fn has_slugs(&self) -> bool {
        !self.slugs.is_empty()
    }

    /// Candidates for `difficulty`, deduplicated by filename in priority order.
    ///
    /// `inferred_bases` are filename bases of sibling difficulties that already
    /// resolved, see [`infer_base_from_url`].
    pub fn generate(&self, difficulty: Difficulty, inferred_bases: &[String]) -> Vec<Candidate> {
        let suffix = difficulty.remote_suffix();
        let legacy = is_legacy_id(self.song_id);
        let mut out: Vec<Candidate> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut push = |filename: String, tier: CandidateTier| {
            if seen.insert(filename.clone()) {
                out.push(Candidate { filename, tier });
            }
        };

        for base in inferred_bases {
            push(chart_filename(base, &suffix), CandidateTier::Inferred);
        }

        if let Some(ov) = &self.override_title {
            if ov.ends_with(&suffix) {
                push(chart_filename(ov, ""), CandidateTier::Override);
            }
            if legacy {
                push(chart_filename(ov, &suffix), CandidateTier::Override);
            } else {
                let prefixed = format!("{}_{}", self.song_id, ov);
                push(chart_filename(&prefixed, &suffix), CandidateTier::Override);
            }
        }

        for jacket in &self.jacket_bases {
            let jacket = jacket.trim();
            if jacket.is_empty() {
                continue;
            }
            if jacket.ends_with(&suffix) {
                push(chart_filename(jacket, ""), CandidateTier::Jacket);
            }
            push(chart_filename(jacket, &suffix), CandidateTier::Jacket);
        }

        for slug in &self.slugs {
            for variant in separator_variants(slug) {
                let base = if legacy {
                    variant
                } else {
                    format!("{}_{}", self.song_id, variant)
                };
                push(chart_filename(&base, &suffix), CandidateTier::Slug);
            }
        }

        out
    }
}

/// Recovers the filename base from a URL that served `difficulty`.
///
/// `.../604_toridori_palette_easy.txt` with `easy` gives `604_toridori_palette`.
pub fn infer_base_from_url(url: &str, difficulty: Difficulty) -> Option<String> {
    let last = url.rsplit('/').next()?;
    let name = urlencoding::decode(last).ok()?;
    let suffix = format!("{}.{}", difficulty.remote_suffix(), CHART_EXTENSION);
    let base = name.strip_suffix(&suffix)?;
    if base.is_empty() {
        None
    } else {
        Some(base.to_string())
    }
}

/// Modern song whose Japanese title equals the English one.
fn repeats_english_title(song_id: u32, title_en: &str, title_jp: Option<&str>) -> bool {
    match title_jp.filter(|t| !t.is_empty()) {
        Some(jp) => !is_legacy_id(song_id) && titles_equal(song_id, title_en, jp),
        None => false,
    }
}

fn chart_filename(base: &str, suffix: &str) -> String {
    format!("{}{}.{}", base, suffix, CHART_EXTENSION)
}

/// Slug of the title plus concatenated and truncated forms, for assets named
/// without separators or after only part of the title.
fn song_name_variants(title: &str) -> Vec<String> {
    let base = slugify(title);
    let tokens: Vec<&str> = base.split('_').filter(|t| !t.is_empty()).collect();

    let mut out = vec![base.clone()];
    if !tokens.is_empty() {
        out.push(tokens.concat());
        out.push(tokens[0].to_string());
    }
    if tokens.len() >= 2 {
        out.push(tokens[..2].join("_"));
        out.push(tokens[..2].concat());
    }
    dedup(out)
}

/// Underscore form first, then hyphen form, then the input as given.
fn separator_variants(slug: &str) -> Vec<String> {
    let raw = slug.trim();
    if raw.is_empty() {
        return Vec::new();
    }

    let mut underscored = raw.replace('-', "_");
    while underscored.contains("__") {
        underscored = underscored.replace("__", "_");
    }
    let underscored = underscored.trim_matches('_').to_string();
    let hyphenated = underscored.replace('_', "-");

    dedup(vec![underscored, hyphenated, raw.to_string()])
}

fn dedup(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|s| !s.is_empty() && seen.insert(s.clone()))
        .collect()
}
