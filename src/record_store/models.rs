use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::warn;

use crate::candidates::CandidateTier;
use crate::chart::Difficulty;
use crate::timestamps::now_iso;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DifficultyStatus {
    #[default]
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "ok")]
    Ok,
    #[serde(rename = "failed")]
    Failed,
    #[serde(rename = "n/a")]
    NotAvailable,
}

/// Which source produced a saved chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceTier {
    Inferred,
    Override,
    Jacket,
    Slug,
    /// Found valid on disk without being downloaded by this tool.
    Disk,
    /// Written by an older version that did not track the tier.
    Unknown,
}

impl SourceTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTier::Inferred => "inferred",
            SourceTier::Override => "override",
            SourceTier::Jacket => "jacket",
            SourceTier::Slug => "slug",
            SourceTier::Disk => "disk",
            SourceTier::Unknown => "unknown",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "inferred" => SourceTier::Inferred,
            "override" => SourceTier::Override,
            "jacket" => SourceTier::Jacket,
            "slug" => SourceTier::Slug,
            "disk" => SourceTier::Disk,
            _ => SourceTier::Unknown,
        }
    }
}

impl From<CandidateTier> for SourceTier {
    fn from(tier: CandidateTier) -> Self {
        match tier {
            CandidateTier::Inferred => SourceTier::Inferred,
            CandidateTier::Override => SourceTier::Override,
            CandidateTier::Jacket => SourceTier::Jacket,
            CandidateTier::Slug => SourceTier::Slug,
        }
    }
}

impl fmt::Display for SourceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SourceTier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SourceTier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(SourceTier::parse(&raw))
    }
}

/// State of one (song, difficulty) pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyState {
    #[serde(default)]
    pub status: DifficultyStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, alias = "source", alias = "source_tier", skip_serializing_if = "Option::is_none")]
    pub source_tier: Option<SourceTier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, alias = "bytes", alias = "byte_size", skip_serializing_if = "Option::is_none")]
    pub byte_size: Option<u64>,
    #[serde(default, alias = "saved_at", skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<String>,
    #[serde(default, alias = "failed_at", skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<String>,
    #[serde(default, alias = "checked_at", skip_serializing_if = "Option::is_none")]
    pub checked_at: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl DifficultyState {
    pub fn is_ok(&self) -> bool {
        self.status == DifficultyStatus::Ok
    }

    /// Fresh state with `status`, keeping only fields this tool does not own.
    fn replaced(&self, status: DifficultyStatus) -> Self {
        Self {
            status,
            extra: self.extra.clone(),
            ..Default::default()
        }
    }
}

/// Facts about a saved chart file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedChart {
    pub file: String,
    pub byte_size: u64,
    pub source_tier: SourceTier,
    pub url: Option<String>,
}

/// Key under which difficulty entries with an unreadable state are kept.
pub const UNREADABLE_DIFFICULTIES_KEY: &str = "unreadableDifficulties";

/// Persisted state of one catalog song.
///
/// Reading is lenient below the song level: difficulty entries and declared
/// tags under names this tool does not know are carried through verbatim,
/// and a known difficulty whose state cannot be read is set aside under
/// [`UNREADABLE_DIFFICULTIES_KEY`] and treated as pending.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "StoredSong")]
pub struct SongRecord {
    pub id: u32,
    pub title_en: Option<String>,
    pub title_jp: Option<String>,
    /// Song directory relative to the output root.
    pub output_location: Option<String>,
    pub available_difficulties: BTreeSet<Difficulty>,
    pub difficulties: BTreeMap<Difficulty, DifficultyState>,
    pub complete: bool,
    pub first_seen_at: Option<String>,
    pub updated_at: Option<String>,
    pub extra: BTreeMap<String, Value>,
    foreign_difficulties: BTreeMap<String, Value>,
    foreign_tags: Vec<Value>,
}

/// Song entry as found on disk, before difficulty names are checked.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSong {
    #[serde(default)]
    id: u32,
    #[serde(default, alias = "title_en")]
    title_en: Option<String>,
    #[serde(default, alias = "title_jp")]
    title_jp: Option<String>,
    #[serde(default, alias = "output_dir")]
    output_location: Option<String>,
    #[serde(default, alias = "available_difficulties")]
    available_difficulties: Vec<Value>,
    #[serde(default)]
    difficulties: BTreeMap<String, Value>,
    #[serde(default)]
    complete: bool,
    #[serde(default, alias = "first_seen_at")]
    first_seen_at: Option<String>,
    #[serde(default, alias = "updated_at")]
    updated_at: Option<String>,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

impl From<StoredSong> for SongRecord {
    fn from(stored: StoredSong) -> Self {
        let mut record = SongRecord {
            id: stored.id,
            title_en: stored.title_en,
            title_jp: stored.title_jp,
            output_location: stored.output_location,
            complete: stored.complete,
            first_seen_at: stored.first_seen_at,
            updated_at: stored.updated_at,
            extra: stored.extra,
            ..Default::default()
        };

        for tag in stored.available_difficulties {
            match tag.as_str().and_then(Difficulty::from_str) {
                Some(difficulty) => {
                    record.available_difficulties.insert(difficulty);
                }
                None => record.foreign_tags.push(tag),
            }
        }

        for (key, value) in stored.difficulties {
            let Some(difficulty) = Difficulty::from_str(&key) else {
                record.foreign_difficulties.insert(key, value);
                continue;
            };
            match serde_json::from_value::<DifficultyState>(value.clone()) {
                Ok(state) => {
                    record.difficulties.insert(difficulty, state);
                }
                Err(e) => {
                    warn!(
                        "Song {}: unreadable {} state ({}), set aside under {}",
                        record.id, difficulty, e, UNREADABLE_DIFFICULTIES_KEY
                    );
                    record.set_aside(key, value);
                }
            }
        }

        record
    }
}

/// Borrowed form written to disk.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SongView<'a> {
    id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    title_en: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title_jp: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_location: Option<&'a str>,
    available_difficulties: TagsView<'a>,
    difficulties: DifficultiesView<'a>,
    complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_seen_at: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_at: Option<&'a str>,
    #[serde(flatten)]
    extra: &'a BTreeMap<String, Value>,
}

struct TagsView<'a> {
    known: &'a BTreeSet<Difficulty>,
    foreign: &'a [Value],
}

impl Serialize for TagsView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.known.len() + self.foreign.len()))?;
        for difficulty in self.known {
            seq.serialize_element(difficulty.as_str())?;
        }
        for tag in self.foreign {
            seq.serialize_element(tag)?;
        }
        seq.end()
    }
}

struct DifficultiesView<'a> {
    known: &'a BTreeMap<Difficulty, DifficultyState>,
    foreign: &'a BTreeMap<String, Value>,
}

impl Serialize for DifficultiesView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.known.len() + self.foreign.len()))?;
        for (difficulty, state) in self.known {
            map.serialize_entry(difficulty.as_str(), state)?;
        }
        for (key, value) in self.foreign {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl Serialize for SongRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        SongView {
            id: self.id,
            title_en: self.title_en.as_deref(),
            title_jp: self.title_jp.as_deref(),
            output_location: self.output_location.as_deref(),
            available_difficulties: TagsView {
                known: &self.available_difficulties,
                foreign: &self.foreign_tags,
            },
            difficulties: DifficultiesView {
                known: &self.difficulties,
                foreign: &self.foreign_difficulties,
            },
            complete: self.complete,
            first_seen_at: self.first_seen_at.as_deref(),
            updated_at: self.updated_at.as_deref(),
            extra: &self.extra,
        }
        .serialize(serializer)
    }
}

impl SongRecord {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// Difficulties `complete` is computed over. Falls back to every
    /// difficulty while the catalog has not declared any.
    pub fn expected_difficulties(&self) -> BTreeSet<Difficulty> {
        if self.available_difficulties.is_empty() {
            Difficulty::ALL.iter().copied().collect()
        } else {
            self.available_difficulties.clone()
        }
    }

    pub fn status(&self, difficulty: Difficulty) -> DifficultyStatus {
        self.difficulties
            .get(&difficulty)
            .map(|s| s.status)
            .unwrap_or_default()
    }

    pub fn state(&self, difficulty: Difficulty) -> Option<&DifficultyState> {
        self.difficulties.get(&difficulty)
    }

    /// Every difficulty gets an entry; missing ones start as pending.
    pub(super) fn ensure_difficulties(&mut self) {
        for difficulty in Difficulty::ALL {
            self.difficulties.entry(difficulty).or_default();
        }
    }

    pub(super) fn refresh_complete(&mut self) {
        let expected = self.expected_difficulties();
        self.complete = expected.iter().all(|d| self.status(*d) == DifficultyStatus::Ok);
    }

    pub fn set_titles(&mut self, title_en: Option<&str>, title_jp: Option<&str>) {
        if let Some(en) = title_en {
            self.title_en = Some(en.to_string());
        }
        if let Some(jp) = title_jp {
            self.title_jp = Some(jp.to_string());
        }
    }

    /// Difficulty entries under names this tool does not know.
    pub fn foreign_difficulties(&self) -> &BTreeMap<String, Value> {
        &self.foreign_difficulties
    }

    fn set_aside(&mut self, key: String, value: Value) {
        let slot = self
            .extra
            .entry(UNREADABLE_DIFFICULTIES_KEY.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        if let Value::Object(entries) = slot {
            entries.insert(key, value);
        }
    }

    fn state_mut(&mut self, difficulty: Difficulty) -> &mut DifficultyState {
        self.difficulties.entry(difficulty).or_default()
    }

    pub fn mark_ok(&mut self, difficulty: Difficulty, saved: SavedChart) {
        let state = self.state_mut(difficulty);
        let mut next = state.replaced(DifficultyStatus::Ok);
        next.file = Some(saved.file);
        next.byte_size = Some(saved.byte_size);
        next.saved_at = Some(now_iso());
        next.source_tier = Some(saved.source_tier);
        next.url = saved.url;
        *state = next;
    }

    pub fn mark_failed(&mut self, difficulty: Difficulty, url: Option<String>, reason: &str) {
        let state = self.state_mut(difficulty);
        let mut next = state.replaced(DifficultyStatus::Failed);
        next.reason = Some(reason.to_string());
        next.url = url;
        next.failed_at = Some(now_iso());
        *state = next;
    }

    pub fn mark_not_available(&mut self, difficulty: Difficulty, url: Option<String>, note: &str) {
        let state = self.state_mut(difficulty);
        let mut next = state.replaced(DifficultyStatus::NotAvailable);
        next.note = Some(note.to_string());
        next.url = url;
        next.checked_at = Some(now_iso());
        *state = next;
    }

    pub fn mark_pending(&mut self, difficulty: Difficulty, note: &str) {
        let state = self.state_mut(difficulty);
        let mut next = state.replaced(DifficultyStatus::Pending);
        next.note = Some(note.to_string());
        next.checked_at = Some(now_iso());
        *state = next;
    }

    /// URLs of difficulties that are `ok`, in difficulty order.
    pub fn ok_urls(&self) -> Vec<(Difficulty, &str)> {
        self.difficulties
            .iter()
            .filter(|(_, state)| state.is_ok())
            .filter_map(|(d, state)| state.url.as_deref().map(|url| (*d, url)))
            .collect()
    }
}
