//! On-disk layout of downloaded charts.
//!
//! One directory per song, named after its title, holding `<difficulty>.txt`
//! files. A marker file inside each directory records which song owns it so
//! two songs with the same title never share a directory.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::chart::{validate, Difficulty, VALIDATION_WINDOW_BYTES};
use crate::record_store::write_atomic;

pub const SONG_ID_MARKER: &str = ".bestdori_song_id";

const MAX_DIR_NAME_CHARS: usize = 120;
const FORBIDDEN_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Portable directory name for a title.
pub fn sanitize_dir_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if FORBIDDEN_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let mut cleaned = replaced.trim().trim_end_matches('.').to_string();
    if cleaned.is_empty() {
        cleaned = "untitled".to_string();
    }
    if cleaned.chars().count() > MAX_DIR_NAME_CHARS {
        let truncated: String = cleaned.chars().take(MAX_DIR_NAME_CHARS).collect();
        cleaned = truncated.trim_end().trim_end_matches('.').to_string();
    }
    cleaned
}

/// State of a chart file on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalChart {
    /// Absent or empty.
    Missing,
    Valid { byte_size: u64 },
    /// Non-empty but without a chart header.
    Invalid,
}

pub struct SongLibrary {
    root: PathBuf,
    dry_run: bool,
}

impl SongLibrary {
    /// With `dry_run` nothing is created, written or removed.
    pub fn new(root: &Path, dry_run: bool) -> Self {
        Self {
            root: root.to_path_buf(),
            dry_run,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for `song_id`.
    ///
    /// A recorded location that still exists is reused. Otherwise the name is
    /// derived from the Japanese title, then the English one, then the id, and
    /// disambiguated with the id when another song already owns it.
    pub fn song_dir(
        &self,
        song_id: u32,
        recorded: Option<&str>,
        title_jp: Option<&str>,
        title_en: Option<&str>,
    ) -> Result<PathBuf, LibraryError> {
        let id = song_id.to_string();
        if let Some(dir) = recorded.map(|loc| self.resolve_location(loc)) {
            if dir.is_dir() {
                if !self.dry_run {
                    std::fs::write(dir.join(SONG_ID_MARKER), &id)?;
                }
                return Ok(dir);
            }
        }

        let base_name = sanitize_dir_name(title_jp.or(title_en).unwrap_or(&id));
        let mut dir = self.root.join(&base_name);
        let disambiguated = self.root.join(format!("{}_{}", base_name, song_id));

        if dir.exists() && !dir.is_dir() {
            dir = disambiguated;
        } else if dir.is_dir() {
            if let Some(owner) = read_marker(&dir) {
                if !owner.is_empty() && owner != id {
                    debug!("{:?} belongs to song {}, using {:?}", dir, owner, disambiguated);
                    dir = disambiguated;
                }
            }
        }

        if !self.dry_run {
            std::fs::create_dir_all(&dir)?;
            std::fs::write(dir.join(SONG_ID_MARKER), &id)?;
        }
        Ok(dir)
    }

    /// Location to store in the record: relative to the root when possible.
    pub fn relative_location(&self, dir: &Path) -> String {
        dir.strip_prefix(&self.root)
            .unwrap_or(dir)
            .to_string_lossy()
            .into_owned()
    }

    fn resolve_location(&self, location: &str) -> PathBuf {
        let path = Path::new(location);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn chart_path(dir: &Path, difficulty: Difficulty) -> PathBuf {
        dir.join(difficulty.local_filename())
    }

    /// Reads only the validation window of the file.
    pub fn inspect(&self, dir: &Path, difficulty: Difficulty) -> Result<LocalChart, LibraryError> {
        let path = Self::chart_path(dir, difficulty);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(LocalChart::Missing),
            Err(e) => return Err(e.into()),
        };
        let byte_size = file.metadata()?.len();
        if byte_size == 0 {
            return Ok(LocalChart::Missing);
        }

        let mut head = Vec::with_capacity(VALIDATION_WINDOW_BYTES);
        file.take(VALIDATION_WINDOW_BYTES as u64).read_to_end(&mut head)?;
        if validate(&head).valid {
            Ok(LocalChart::Valid { byte_size })
        } else {
            Ok(LocalChart::Invalid)
        }
    }

    /// Writes the chart atomically and returns its size.
    pub fn write_chart(
        &self,
        dir: &Path,
        difficulty: Difficulty,
        content: &[u8],
    ) -> Result<u64, LibraryError> {
        if !self.dry_run {
            write_atomic(&Self::chart_path(dir, difficulty), content)?;
        }
        Ok(content.len() as u64)
    }

    pub fn remove_chart(&self, dir: &Path, difficulty: Difficulty) -> Result<(), LibraryError> {
        if self.dry_run {
            return Ok(());
        }
        match std::fs::remove_file(Self::chart_path(dir, difficulty)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn read_marker(dir: &Path) -> Option<String> {
    std::fs::read_to_string(dir.join(SONG_ID_MARKER))
        .ok()
        .map(|s| s.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::HEADER_MARKER;
    use tempfile::TempDir;

    fn chart() -> Vec<u8> {
        let mut blob = HEADER_MARKER.to_vec();
        blob.extend_from_slice(b"\nBPM 180\n");
        blob
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize_dir_name("Yes! BanG_Dream!"), "Yes! BanG_Dream!");
        assert_eq!(sanitize_dir_name("a/b:c*d?"), "a_b_c_d_");
        assert_eq!(sanitize_dir_name("  dots... "), "dots");
        assert_eq!(sanitize_dir_name(" .. "), "untitled");
        assert_eq!(sanitize_dir_name(""), "untitled");

        let long = "あ".repeat(130);
        assert_eq!(sanitize_dir_name(&long).chars().count(), 120);
    }

    #[test]
    fn test_song_dir_prefers_jp_title_and_writes_marker() {
        let root = TempDir::new().unwrap();
        let library = SongLibrary::new(root.path(), false);

        let dir = library
            .song_dir(489, None, Some("迷い子"), Some("Mayoiuta"))
            .unwrap();
        assert_eq!(dir, root.path().join("迷い子"));
        assert_eq!(
            std::fs::read_to_string(dir.join(SONG_ID_MARKER)).unwrap(),
            "489"
        );
        assert_eq!(library.relative_location(&dir), "迷い子");
    }

    #[test]
    fn test_song_dir_collision_uses_id_suffix() {
        let root = TempDir::new().unwrap();
        let library = SongLibrary::new(root.path(), false);

        library.song_dir(100, None, Some("Same"), None).unwrap();
        let second = library.song_dir(200, None, Some("Same"), None).unwrap();
        assert_eq!(second, root.path().join("Same_200"));

        // The owner keeps its directory.
        let again = library.song_dir(100, None, Some("Same"), None).unwrap();
        assert_eq!(again, root.path().join("Same"));

        std::fs::write(root.path().join("File"), "x").unwrap();
        let beside_file = library.song_dir(300, None, None, Some("File")).unwrap();
        assert_eq!(beside_file, root.path().join("File_300"));
    }

    #[test]
    fn test_song_dir_reuses_recorded_location() {
        let root = TempDir::new().unwrap();
        let library = SongLibrary::new(root.path(), false);
        std::fs::create_dir_all(root.path().join("Old Name")).unwrap();

        let dir = library
            .song_dir(7, Some("Old Name"), Some("New Name"), None)
            .unwrap();
        assert_eq!(dir, root.path().join("Old Name"));
        assert_eq!(
            std::fs::read_to_string(dir.join(SONG_ID_MARKER)).unwrap(),
            "7"
        );

        // A stale location falls back to the title.
        let dir = library.song_dir(8, Some("Gone"), None, Some("Eight")).unwrap();
        assert_eq!(dir, root.path().join("Eight"));
    }

    #[test]
    fn test_dry_run_creates_nothing() {
        let root = TempDir::new().unwrap();
        let library = SongLibrary::new(root.path(), true);
        let dir = library.song_dir(1, None, None, None).unwrap();
        assert_eq!(dir, root.path().join("1"));
        assert!(!dir.exists());
        library.write_chart(&dir, Difficulty::Easy, &chart()).unwrap();
        assert!(!dir.exists());
    }

    #[test]
    fn test_inspect_write_remove() {
        let root = TempDir::new().unwrap();
        let library = SongLibrary::new(root.path(), false);
        let dir = library.song_dir(1, None, None, Some("One")).unwrap();

        assert_eq!(library.inspect(&dir, Difficulty::Hard).unwrap(), LocalChart::Missing);

        let size = library.write_chart(&dir, Difficulty::Hard, &chart()).unwrap();
        assert_eq!(
            library.inspect(&dir, Difficulty::Hard).unwrap(),
            LocalChart::Valid { byte_size: size }
        );

        std::fs::write(SongLibrary::chart_path(&dir, Difficulty::Easy), "<html>").unwrap();
        assert_eq!(library.inspect(&dir, Difficulty::Easy).unwrap(), LocalChart::Invalid);

        std::fs::write(SongLibrary::chart_path(&dir, Difficulty::Normal), "").unwrap();
        assert_eq!(library.inspect(&dir, Difficulty::Normal).unwrap(), LocalChart::Missing);

        library.remove_chart(&dir, Difficulty::Easy).unwrap();
        assert!(!SongLibrary::chart_path(&dir, Difficulty::Easy).exists());
        library.remove_chart(&dir, Difficulty::Easy).unwrap();
    }
}
