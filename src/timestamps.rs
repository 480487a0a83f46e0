use chrono::{Local, SecondsFormat};

/// Local time with offset, second precision: `2026-01-11T03:38:31+08:00`.
pub fn now_iso() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Filesystem-safe stamp: `20260111_033831`.
pub fn now_file_stamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}
