use std::collections::BTreeSet;

use tracing::warn;

/// Ids fetched when none are given: the regular catalog plus the 10001..=10010
/// collaboration block.
pub fn default_song_ids() -> Vec<u32> {
    (1..=750).chain(10001..=10010).collect()
}

/// Parses ids given as separate arguments, comma lists or a mix
/// (`489 545`, `489,545`, `"489, 545"`). Result is sorted and deduplicated.
pub fn parse_song_ids(args: &[String]) -> Result<Vec<u32>, std::num::ParseIntError> {
    let mut ids = BTreeSet::new();
    for token in args {
        for part in token.split(|c: char| c == ',' || c.is_whitespace()) {
            if part.is_empty() {
                continue;
            }
            ids.insert(part.parse::<u32>()?);
        }
    }
    Ok(ids.into_iter().collect())
}

/// Ids to process for the given arguments. Falls back to the defaults when
/// nothing usable was given or parsing fails.
pub fn resolve_song_ids(args: &[String]) -> Vec<u32> {
    match parse_song_ids(args) {
        Ok(ids) if !ids.is_empty() => ids,
        Ok(_) => default_song_ids(),
        Err(e) => {
            warn!("Could not parse song ids {:?} ({}), using defaults", args, e);
            default_song_ids()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_default_ids() {
        let ids = default_song_ids();
        assert_eq!(ids.len(), 760);
        assert_eq!(ids.first(), Some(&1));
        assert!(ids.contains(&750));
        assert!(!ids.contains(&751));
        assert_eq!(ids.last(), Some(&10010));
    }

    #[test]
    fn test_parse_mixed_separators() {
        let ids = parse_song_ids(&args(&["545", "489,12", "7, 3"])).unwrap();
        assert_eq!(ids, vec![3, 7, 12, 489, 545]);
    }

    #[test]
    fn test_parse_deduplicates() {
        let ids = parse_song_ids(&args(&["489", "489,489"])).unwrap();
        assert_eq!(ids, vec![489]);
    }

    #[test]
    fn test_invalid_ids_fall_back_to_defaults() {
        assert!(parse_song_ids(&args(&["12", "abc"])).is_err());
        assert_eq!(resolve_song_ids(&args(&["12", "abc"])), default_song_ids());
    }

    #[test]
    fn test_empty_args_use_defaults() {
        assert_eq!(resolve_song_ids(&[]), default_song_ids());
        assert_eq!(resolve_song_ids(&args(&[" , "])), default_song_ids());
    }
}
