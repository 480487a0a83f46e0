use std::collections::BTreeMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use super::migration::{migrate, CURRENT_SCHEMA_VERSION};
use super::models::SongRecord;
use crate::timestamps::now_iso;

#[derive(Debug, Error)]
pub enum RecordStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed record file: {0}")]
    Malformed(String),

    #[error("Failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// On-disk document.
///
/// Song entries are read one by one; an entry that cannot be read is kept
/// verbatim and written back unchanged until this tool records that song
/// afresh.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "StoredFile")]
pub struct RecordFile {
    pub schema_version: u32,
    pub region: String,
    pub updated_at: Option<String>,
    /// Keyed by the decimal song id.
    pub songs: BTreeMap<String, SongRecord>,
    pub extra: BTreeMap<String, Value>,
    unreadable_songs: BTreeMap<String, Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredFile {
    #[serde(default = "current_schema_version")]
    schema_version: u32,
    #[serde(default)]
    region: String,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default)]
    songs: BTreeMap<String, Value>,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

fn current_schema_version() -> u32 {
    CURRENT_SCHEMA_VERSION
}

impl From<StoredFile> for RecordFile {
    fn from(stored: StoredFile) -> Self {
        let mut file = RecordFile {
            schema_version: stored.schema_version,
            region: stored.region,
            updated_at: stored.updated_at,
            songs: BTreeMap::new(),
            extra: stored.extra,
            unreadable_songs: BTreeMap::new(),
        };
        for (key, value) in stored.songs {
            match serde_json::from_value::<SongRecord>(value.clone()) {
                Ok(mut song) => {
                    if song.id == 0 {
                        if let Ok(id) = key.parse() {
                            song.id = id;
                        }
                    }
                    file.songs.insert(key, song);
                }
                Err(e) => {
                    warn!("Keeping unreadable record entry {:?} as is: {}", key, e);
                    file.unreadable_songs.insert(key, value);
                }
            }
        }
        file
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum SongEntry<'a> {
    Read(&'a SongRecord),
    Unreadable(&'a Value),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FileView<'a> {
    schema_version: u32,
    region: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_at: Option<&'a str>,
    songs: BTreeMap<&'a str, SongEntry<'a>>,
    #[serde(flatten)]
    extra: &'a BTreeMap<String, Value>,
}

impl Serialize for RecordFile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut songs: BTreeMap<&str, SongEntry> = self
            .unreadable_songs
            .iter()
            .map(|(key, value)| (key.as_str(), SongEntry::Unreadable(value)))
            .collect();
        for (key, song) in &self.songs {
            songs.insert(key.as_str(), SongEntry::Read(song));
        }
        FileView {
            schema_version: self.schema_version,
            region: &self.region,
            updated_at: self.updated_at.as_deref(),
            songs,
            extra: &self.extra,
        }
        .serialize(serializer)
    }
}

impl RecordFile {
    pub fn empty(region: &str) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            region: region.to_string(),
            updated_at: None,
            songs: BTreeMap::new(),
            extra: BTreeMap::new(),
            unreadable_songs: BTreeMap::new(),
        }
    }

    /// Entries under `songs` that could not be read.
    pub fn unreadable_songs(&self) -> &BTreeMap<String, Value> {
        &self.unreadable_songs
    }

    fn parse(raw: &str) -> Result<Self, RecordStoreError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| RecordStoreError::Malformed(e.to_string()))?;
        let mut root = match value {
            Value::Object(map) => map,
            _ => {
                return Err(RecordStoreError::Malformed(
                    "top level is not an object".to_string(),
                ))
            }
        };
        if migrate(&mut root) {
            debug!("Migrated record file to schema {}", CURRENT_SCHEMA_VERSION);
        }
        serde_json::from_value(Value::Object(root))
            .map_err(|e| RecordStoreError::Malformed(e.to_string()))
    }
}

/// Cumulative record of every song's per-difficulty state.
///
/// All mutation goes through [`RecordStore::update`], which persists the whole
/// document atomically whenever the song changed.
pub struct RecordStore {
    path: PathBuf,
    file: RecordFile,
    read_only: bool,
}

impl RecordStore {
    /// Loads the record at `path`. A missing file starts empty. A document
    /// that cannot be parsed at all is moved to `<name>.bak` and the store
    /// starts empty. Other IO errors are returned.
    pub fn open(path: &Path, region: &str) -> Result<Self, RecordStoreError> {
        Self::load(path, region, false)
    }

    /// Like [`RecordStore::open`] but nothing on disk is ever touched.
    pub fn open_read_only(path: &Path, region: &str) -> Result<Self, RecordStoreError> {
        Self::load(path, region, true)
    }

    fn load(path: &Path, region: &str, read_only: bool) -> Result<Self, RecordStoreError> {
        let file = match std::fs::read_to_string(path) {
            Ok(raw) => match RecordFile::parse(&raw) {
                Ok(file) => file,
                Err(RecordStoreError::Malformed(reason)) if read_only => {
                    warn!("Ignoring unreadable record {:?} ({})", path, reason);
                    RecordFile::empty(region)
                }
                Err(RecordStoreError::Malformed(reason)) => {
                    let backup = backup_path(path);
                    std::fs::rename(path, &backup)?;
                    warn!(
                        "Unreadable record {:?} ({}) moved to {:?}, starting empty",
                        path, reason, backup
                    );
                    RecordFile::empty(region)
                }
                Err(e) => return Err(e),
            },
            Err(e) if e.kind() == ErrorKind::NotFound => RecordFile::empty(region),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path: path.to_path_buf(),
            file,
            read_only,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file(&self) -> &RecordFile {
        &self.file
    }

    pub fn song(&self, song_id: u32) -> Option<&SongRecord> {
        self.file.songs.get(&song_id.to_string())
    }

    /// Applies `mutate` to the song's record, creating it if needed.
    ///
    /// Before `mutate` runs every difficulty has an entry. Afterwards
    /// `complete` is recomputed and, if the record differs from before, the
    /// document is persisted.
    pub fn update<F>(&mut self, song_id: u32, mutate: F) -> Result<&SongRecord, RecordStoreError>
    where
        F: FnOnce(&mut SongRecord),
    {
        let key = song_id.to_string();
        let before = self.file.songs.get(&key).cloned();

        let record = self
            .file
            .songs
            .entry(key.clone())
            .or_insert_with(|| SongRecord::new(song_id));
        record.ensure_difficulties();
        if record.first_seen_at.is_none() {
            record.first_seen_at = Some(now_iso());
        }
        mutate(record);
        record.refresh_complete();

        let changed = before.as_ref() != Some(&*record);
        if changed {
            record.updated_at = Some(now_iso());
            self.persist()?;
        }

        Ok(&self.file.songs[&key])
    }

    /// Writes the whole document through a temp file in the same directory,
    /// then renames it over the old one.
    fn persist(&mut self) -> Result<(), RecordStoreError> {
        if self.read_only {
            return Ok(());
        }
        self.file.updated_at = Some(now_iso());
        self.file.schema_version = CURRENT_SCHEMA_VERSION;
        let json = serde_json::to_vec_pretty(&self.file)?;
        write_atomic(&self.path, &json)?;
        Ok(())
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

/// Replaces `path` with `bytes` without ever exposing a partial file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
