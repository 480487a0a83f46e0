//! Chart files: difficulty tags and content validation.

mod validator;

pub use validator::{validate, ContentVerdict, HEADER_MARKER, VALIDATION_WINDOW_BYTES};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Extension of chart files, both on the asset host and on disk.
pub const CHART_EXTENSION: &str = "txt";

/// Difficulty tag of a chart.
///
/// Ordering follows the catalog's numeric difficulty keys, which is also the
/// order difficulties are processed and persisted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
    Expert,
    Special,
}

impl Difficulty {
    pub const ALL: [Difficulty; 5] = [
        Difficulty::Easy,
        Difficulty::Normal,
        Difficulty::Hard,
        Difficulty::Expert,
        Difficulty::Special,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Normal => "normal",
            Difficulty::Hard => "hard",
            Difficulty::Expert => "expert",
            Difficulty::Special => "special",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "easy" => Some(Difficulty::Easy),
            "normal" => Some(Difficulty::Normal),
            "hard" => Some(Difficulty::Hard),
            "expert" => Some(Difficulty::Expert),
            "special" => Some(Difficulty::Special),
            _ => None,
        }
    }

    /// Maps the catalog's numeric difficulty key ("0".."4").
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// `_{tag}` suffix used by remote filenames.
    pub fn remote_suffix(&self) -> String {
        format!("_{}", self.as_str())
    }

    /// Local filename of this difficulty inside a song directory.
    pub fn local_filename(&self) -> String {
        format!("{}.{}", self.as_str(), CHART_EXTENSION)
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_index_matches_catalog_keys() {
        assert_eq!(Difficulty::from_index(0), Some(Difficulty::Easy));
        assert_eq!(Difficulty::from_index(3), Some(Difficulty::Expert));
        assert_eq!(Difficulty::from_index(4), Some(Difficulty::Special));
        assert_eq!(Difficulty::from_index(5), None);
    }

    #[test]
    fn test_string_round_trip() {
        for d in Difficulty::ALL {
            assert_eq!(Difficulty::from_str(d.as_str()), Some(d));
        }
        assert_eq!(Difficulty::from_str("EXPERT"), None);
    }

    #[test]
    fn test_serializes_as_map_key() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(Difficulty::Special, 1);
        map.insert(Difficulty::Easy, 0);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"easy":0,"special":1}"#);
    }

    #[test]
    fn test_filenames() {
        assert_eq!(Difficulty::Hard.local_filename(), "hard.txt");
        assert_eq!(Difficulty::Hard.remote_suffix(), "_hard");
    }
}
