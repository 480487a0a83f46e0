//! Reading ledger files back for operators.
//!
//! Tolerates every shape ledgers have had: `failures` as an object keyed by
//! id, `failures` as a list, or a bare list of entries or ids.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;

/// Song ids in one ledger document, in document order, deduplicated.
pub fn ids_in_document(doc: &Value) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    let mut push = |id: Option<String>| {
        if let Some(id) = id.filter(|s| !s.is_empty()) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    };

    match doc {
        Value::Object(root) => match root.get("failures") {
            Some(Value::Array(items)) => items.iter().for_each(|item| push(item_id(item, None))),
            Some(Value::Object(entries)) => entries
                .iter()
                .for_each(|(key, entry)| push(item_id(entry, Some(key)))),
            _ => root
                .iter()
                .filter(|(key, _)| key.as_str() != "failures")
                .filter(|(_, entry)| entry.is_object())
                .for_each(|(key, entry)| push(item_id(entry, Some(key)))),
        },
        Value::Array(items) => items.iter().for_each(|item| push(item_id(item, None))),
        _ => {}
    }
    ids
}

fn item_id(item: &Value, key: Option<&str>) -> Option<String> {
    match item {
        Value::Object(obj) => obj
            .get("id")
            .or_else(|| obj.get("score_id"))
            .and_then(scalar_to_string)
            .or_else(|| key.map(str::to_string)),
        Value::Number(_) | Value::String(_) => scalar_to_string(item),
        _ => key.map(str::to_string),
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.trim().to_string()),
        _ => None,
    }
}

pub fn ids_in_file(path: &Path) -> Result<Vec<String>> {
    let raw = std::fs::read(path).with_context(|| format!("Failed to read ledger {:?}", path))?;
    let doc: Value =
        serde_json::from_slice(&raw).with_context(|| format!("Failed to parse ledger {:?}", path))?;
    Ok(ids_in_document(&doc))
}

/// Ledger files of `region` in `dir`, sorted by name.
pub fn find_ledgers(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("Failed to list directory {:?}", dir))?;
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with(&format!("{}_", prefix)) && n.ends_with(".json"))
                    .unwrap_or(false)
        })
        .collect();
    paths.sort();
    Ok(paths)
}

/// Most recently modified path; ties broken by name.
pub fn latest(paths: &[PathBuf]) -> Option<PathBuf> {
    paths
        .iter()
        .map(|p| {
            let modified = std::fs::metadata(p).and_then(|m| m.modified()).ok();
            (modified, p)
        })
        .max_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.file_name().cmp(&b.1.file_name())))
        .map(|(_, p)| p.clone())
}

/// Ids across `paths` in order, deduplicated.
pub fn collect_ids(paths: &[PathBuf]) -> Result<Vec<String>> {
    let mut all: Vec<String> = Vec::new();
    for path in paths {
        for id in ids_in_file(path)? {
            if !all.contains(&id) {
                all.push(id);
            }
        }
    }
    Ok(all)
}
