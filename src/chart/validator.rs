//! Classifies downloaded or cached bytes as a chart, an HTML shell, or neither.
//!
//! The asset host answers many missing paths with `200 OK` and an HTML page, so
//! the status code alone never proves a chart exists.

/// Token every genuine chart carries in its header block.
pub const HEADER_MARKER: &[u8] = b"*---------------------- HEADER FIELD";

/// Only this many leading bytes are searched for the marker. Some charts carry an
/// ASCII-art title block before the header, so the marker is not always first.
pub const VALIDATION_WINDOW_BYTES: usize = 16 * 1024;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Outcome of [`validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContentVerdict {
    /// Header marker found in the validation window.
    pub valid: bool,
    /// Content starts with `<!DOCTYPE html` or `<html` (case-insensitive).
    pub is_html_shell: bool,
}

pub fn validate(blob: &[u8]) -> ContentVerdict {
    let content = blob.strip_prefix(UTF8_BOM).unwrap_or(blob);
    if content.is_empty() {
        return ContentVerdict::default();
    }

    let window = &content[..content.len().min(VALIDATION_WINDOW_BYTES)];
    ContentVerdict {
        valid: contains(window, HEADER_MARKER),
        is_html_shell: looks_like_html(content),
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

fn looks_like_html(content: &[u8]) -> bool {
    let start = content
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(content.len());
    let trimmed = &content[start..];
    starts_with_ignore_case(trimmed, b"<!doctype html") || starts_with_ignore_case(trimmed, b"<html")
}

fn starts_with_ignore_case(haystack: &[u8], prefix: &[u8]) -> bool {
    haystack.len() >= prefix.len() && haystack[..prefix.len()].eq_ignore_ascii_case(prefix)
}
