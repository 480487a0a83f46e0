use std::collections::{BTreeSet, HashMap};

use serde_json::Value;

use crate::chart::Difficulty;

/// What the catalog knows about one song.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogEntry {
    pub title_en: Option<String>,
    pub title_jp: Option<String>,
    /// `None` when the entry carries no usable difficulty data, in which case
    /// every difficulty might exist.
    pub difficulties: Option<BTreeSet<Difficulty>>,
    /// Cover-art names, trimmed and deduplicated.
    pub jacket_bases: Vec<String>,
}

/// Parsed song catalog keyed by song id.
#[derive(Debug, Default)]
pub struct CatalogIndex {
    entries: HashMap<u32, CatalogEntry>,
}

impl CatalogIndex {
    /// Parses the catalog document. Entries that are not objects or whose key
    /// is not a numeric id are ignored; only a document that is not a JSON
    /// object at all is an error.
    pub fn parse(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let root: serde_json::Map<String, Value> = serde_json::from_slice(bytes)?;
        let entries = root
            .iter()
            .filter_map(|(key, value)| {
                let id = key.trim().parse::<u32>().ok()?;
                let obj = value.as_object()?;
                Some((id, parse_entry(obj)))
            })
            .collect();
        Ok(Self { entries })
    }

    pub fn entry(&self, song_id: u32) -> Option<&CatalogEntry> {
        self.entries.get(&song_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_entry(obj: &serde_json::Map<String, Value>) -> CatalogEntry {
    // musicTitle is ordered [JP, EN, TW, CN, KR] with nulls for missing regions.
    let titles = obj.get("musicTitle").and_then(Value::as_array);
    let title_at = |i: usize| {
        titles
            .and_then(|t| t.get(i))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    CatalogEntry {
        title_en: title_at(1),
        title_jp: title_at(0),
        difficulties: obj.get("difficulty").and_then(parse_difficulties),
        jacket_bases: obj
            .get("jacketImage")
            .and_then(Value::as_array)
            .map(|names| parse_jackets(names))
            .unwrap_or_default(),
    }
}

/// Difficulty keys are "0".."4"; unknown indices are ignored.
fn parse_difficulties(value: &Value) -> Option<BTreeSet<Difficulty>> {
    let obj = value.as_object()?;
    let set: BTreeSet<Difficulty> = obj
        .keys()
        .filter_map(|k| k.trim().parse::<usize>().ok())
        .filter_map(Difficulty::from_index)
        .collect();
    if set.is_empty() {
        None
    } else {
        Some(set)
    }
}

fn parse_jackets(names: &[Value]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in names.iter().filter_map(Value::as_str) {
        let name = name.trim();
        if !name.is_empty() && !out.iter().any(|seen| seen == name) {
            out.push(name.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "0": {"musicTitle": ["Bestdori!", "Bestdori!", null]},
        "1": {
            "musicTitle": ["ときめきエクスペリエンス！", "Tokimeki Experience!", null],
            "difficulty": {"0": {}, "1": {}, "2": {}, "3": {}},
            "jacketImage": ["yes_bang_dream"]
        },
        "489": {
            "musicTitle": ["迷い子", "Mayoiuta", null],
            "difficulty": {"0": {}, "1": {}, "2": {}, "3": {}, "4": {}},
            "jacketImage": [" 489_mayoiuta ", "489_mayoiuta", ""]
        },
        "500": {"musicTitle": ["", null]},
        "501": {"difficulty": {"x": {}, "9": {}}},
        "abc": {"musicTitle": ["x", "y"]},
        "502": "not an object"
    }"#;

    #[test]
    fn test_titles_are_jp_then_en() {
        let index = CatalogIndex::parse(SAMPLE.as_bytes()).unwrap();
        let entry = index.entry(1).unwrap();
        assert_eq!(entry.title_jp.as_deref(), Some("ときめきエクスペリエンス！"));
        assert_eq!(entry.title_en.as_deref(), Some("Tokimeki Experience!"));
    }

    #[test]
    fn test_difficulties_from_numeric_keys() {
        let index = CatalogIndex::parse(SAMPLE.as_bytes()).unwrap();
        let easy_to_expert: BTreeSet<Difficulty> = Difficulty::ALL[..4].iter().copied().collect();
        assert_eq!(index.entry(1).unwrap().difficulties, Some(easy_to_expert));
        assert!(index
            .entry(489)
            .unwrap()
            .difficulties
            .as_ref()
            .unwrap()
            .contains(&Difficulty::Special));
    }

    #[test]
    fn test_missing_or_unusable_data() {
        let index = CatalogIndex::parse(SAMPLE.as_bytes()).unwrap();
        let empty_titles = index.entry(500).unwrap();
        assert_eq!(empty_titles.title_en, None);
        assert_eq!(empty_titles.title_jp, None);
        assert_eq!(empty_titles.difficulties, None);
        assert_eq!(index.entry(501).unwrap().difficulties, None);
        assert!(index.entry(502).is_none());
        assert!(index.entry(9999).is_none());
        assert_eq!(index.len(), 5);
    }

    #[test]
    fn test_jackets_trimmed_and_deduplicated() {
        let index = CatalogIndex::parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(index.entry(489).unwrap().jacket_bases, vec!["489_mayoiuta"]);
    }

    #[test]
    fn test_non_object_document_is_error() {
        assert!(CatalogIndex::parse(b"[1, 2, 3]").is_err());
        assert!(CatalogIndex::parse(b"<!DOCTYPE html>").is_err());
    }
}
