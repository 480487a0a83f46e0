use lazy_static::lazy_static;
use regex::Regex;
use std::ops::RangeInclusive;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Songs in this id range use the early naming scheme: no `{id}_` prefix on
/// asset filenames, and titles are compared loosely.
pub const LEGACY_ID_RANGE: RangeInclusive<u32> = 1..=50;

const APOSTROPHES: &[char] = &['\'', '\u{2019}', '\u{2018}', '`', '\u{00B4}'];
const TOKEN_TRIM: &[char] = &[',', '.', ';', ':', '!', '?', '"', '\'', '(', ')', '[', ']', '{', '}'];

lazy_static! {
    static ref PUNCT_OR_SEPARATOR: Regex =
        Regex::new(r"[\p{P}\p{Z}]").expect("static regex is valid");
}

pub fn is_legacy_id(song_id: u32) -> bool {
    LEGACY_ID_RANGE.contains(&song_id)
}

/// NFKC, trimmed, internal whitespace runs collapsed to one space.
pub fn strict_key(title: &str) -> String {
    let normalized: String = title.nfkc().collect();
    normalized.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// NFKC, lowercased, with every punctuation and separator character removed.
pub fn loose_key(title: &str) -> String {
    let normalized: String = title.nfkc().collect();
    let lowered = normalized.trim().to_lowercase();
    PUNCT_OR_SEPARATOR.replace_all(&lowered, "").into_owned()
}

/// Compares two titles under the mode the song's era calls for.
pub fn titles_equal(song_id: u32, a: &str, b: &str) -> bool {
    if is_legacy_id(song_id) {
        loose_key(a) == loose_key(b)
    } else {
        strict_key(a) == strict_key(b)
    }
}

/// Lowercase, underscore-separated, alphanumeric-only form of a title.
///
/// Diacritics are dropped, apostrophes vanish without leaving a separator
/// (`don't` becomes `dont`), and `&` reads as `and`.
pub fn slugify(title: &str) -> String {
    let decomposed: String = title
        .trim()
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    let lowered = decomposed
        .to_lowercase()
        .replace(APOSTROPHES, "")
        .replace('&', " and ");

    let mut slug = String::with_capacity(lowered.len());
    let mut pending_separator = false;
    for ch in lowered.chars() {
        if ch.is_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('_');
            }
            pending_separator = false;
            slug.push(ch);
        } else {
            pending_separator = true;
        }
    }
    slug
}

/// Title chosen to derive asset filenames from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetTitle {
    pub title: String,
    /// Full English title, set when `title` was cut down to its first word.
    pub truncated_from: Option<String>,
}

impl AssetTitle {
    fn full(title: &str) -> Self {
        Self {
            title: title.to_string(),
            truncated_from: None,
        }
    }

    /// The chosen title followed by the untruncated fallback, if any.
    pub fn variants(&self) -> Vec<&str> {
        let mut out = vec![self.title.as_str()];
        if let Some(full) = &self.truncated_from {
            if full != &self.title {
                out.push(full.as_str());
            }
        }
        out
    }
}

/// Picks the title the host most likely named the song's assets after.
///
/// When the Japanese title merely repeats the English one, modern assets use only
/// the first word of it while legacy assets keep the full title.
pub fn pick_asset_title(song_id: u32, title_en: &str, title_jp: Option<&str>) -> AssetTitle {
    let Some(title_jp) = title_jp.filter(|t| !t.is_empty()) else {
        return AssetTitle::full(title_en);
    };
    if is_legacy_id(song_id) || !titles_equal(song_id, title_en, title_jp) {
        return AssetTitle::full(title_en);
    }

    match title_en.split_whitespace().next() {
        Some(first) => {
            let first = first.trim_matches(TOKEN_TRIM);
            if first.is_empty() {
                AssetTitle::full(title_en)
            } else {
                AssetTitle {
                    title: first.to_string(),
                    truncated_from: Some(title_en.to_string()),
                }
            }
        }
        None => AssetTitle::full(title_en),
    }
}
