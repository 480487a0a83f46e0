//! Songs whose asset name cannot be derived from any of their titles.
//!
//! The host is case-sensitive, so entries are used exactly as written.

const ASSET_TITLE_OVERRIDES: &[(u32, &str)] = &[
    (4, "teardrop"),
    (5, "sunsunseven"),
    (12, "hashikimi"),
    (13, "senkai"),
    (19, "drepare"),
    (21, "i-aru"),
    (24, "miracle"),
    (25, "kirayume"),
    (30, "re_birthday"),
    (40, "hapipa"),
    (46, "littleBusters"),
    (51, "singout"),
    (531, "ave_mujica"),
    (659, "kiLL_kiSS"),
    (10003, "fangzhou"),
];

pub fn asset_title_override(song_id: u32) -> Option<&'static str> {
    ASSET_TITLE_OVERRIDES
        .iter()
        .find(|(id, _)| *id == song_id)
        .map(|(_, title)| *title)
}
