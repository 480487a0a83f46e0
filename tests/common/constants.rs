#![allow(dead_code)]

pub const ASSETS_BASE_URL: &str = "http://assets.test/assets";
pub const CATALOG_URL: &str = "http://assets.test/api/songs/all.7.json";
pub const REGION: &str = "cn";

pub const MAYOIUTA_ID: u32 = 489;
pub const MAYOIUTA_EN: &str = "Mayoiuta";
pub const MAYOIUTA_JP: &str = "迷い子";

/// Catalog declaring easy to expert for 489; special is left out.
pub const MAYOIUTA_CATALOG: &str = r#"{
    "0": {"musicTitle": ["Bestdori!", "Bestdori!", null]},
    "489": {
        "musicTitle": ["迷い子", "Mayoiuta", null],
        "difficulty": {"0": {}, "1": {}, "2": {}, "3": {}}
    }
}"#;

/// Catalog declaring only easy for 489.
pub const MAYOIUTA_EASY_ONLY_CATALOG: &str = r#"{
    "489": {
        "musicTitle": ["迷い子", "Mayoiuta", null],
        "difficulty": {"0": {}}
    }
}"#;

/// Catalog declaring easy and normal for 489.
pub const MAYOIUTA_EASY_NORMAL_CATALOG: &str = r#"{
    "489": {
        "musicTitle": ["迷い子", "Mayoiuta", null],
        "difficulty": {"0": {}, "1": {}}
    }
}"#;
