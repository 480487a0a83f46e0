//! Upgrades older record documents before they are deserialized.

use serde_json::{Map, Value};

use crate::chart::Difficulty;

pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// Rewrites `root` in place to the current schema.
///
/// Version 1 tracked saved charts as a `saved_difficulties` list; each listed
/// difficulty becomes `ok` and every other one `pending`. Songs that already
/// have a `difficulties` map are left alone. Returns true if anything changed.
pub fn migrate(root: &mut Map<String, Value>) -> bool {
    let mut changed = rename_key(root, "schema_version", "schemaVersion");
    changed |= rename_key(root, "updated_at", "updatedAt");

    let version = root
        .get("schemaVersion")
        .and_then(Value::as_u64)
        .unwrap_or(CURRENT_SCHEMA_VERSION as u64);
    if version >= CURRENT_SCHEMA_VERSION as u64 {
        return changed;
    }

    if let Some(songs) = root.get_mut("songs").and_then(Value::as_object_mut) {
        for song in songs.values_mut().filter_map(Value::as_object_mut) {
            if song.contains_key("difficulties") {
                continue;
            }
            let saved: Vec<String> = match song.get("saved_difficulties").and_then(Value::as_array) {
                Some(list) => list
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
                None => continue,
            };

            let mut difficulties = Map::new();
            for difficulty in Difficulty::ALL {
                let status = if saved.iter().any(|s| s == difficulty.as_str()) {
                    "ok"
                } else {
                    "pending"
                };
                let mut state = Map::new();
                state.insert("status".to_string(), Value::from(status));
                difficulties.insert(difficulty.as_str().to_string(), Value::Object(state));
            }
            song.insert("difficulties".to_string(), Value::Object(difficulties));
        }
    }

    root.insert(
        "schemaVersion".to_string(),
        Value::from(CURRENT_SCHEMA_VERSION),
    );
    true
}

fn rename_key(map: &mut Map<String, Value>, from: &str, to: &str) -> bool {
    match map.remove(from) {
        Some(value) => {
            map.entry(to.to_string()).or_insert(value);
            true
        }
        None => false,
    }
}
