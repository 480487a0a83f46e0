//! Remote asset paths.

pub const DEFAULT_ASSETS_BASE_URL: &str = "https://bestdori.com/assets";

/// Builds asset URLs for one region of the host.
#[derive(Debug, Clone)]
pub struct AssetLocator {
    base_url: String,
    region: String,
}

impl AssetLocator {
    pub fn new(base_url: &str, region: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            region: region.to_string(),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Charts are grouped in bundles of ten ids: 1..=10 live in
    /// `musicscore10_rip`, 481..=490 in `musicscore490_rip`.
    pub fn bundle_for(song_id: u32) -> String {
        let bucket = u64::from(song_id).div_ceil(10) * 10;
        format!("musicscore{}_rip", bucket)
    }

    pub fn url_for(&self, bundle: &str, filename: &str) -> String {
        format!(
            "{}/{}/musicscore/{}/{}",
            self.base_url,
            self.region,
            bundle,
            encode_filename(filename)
        )
    }

    pub fn chart_url(&self, song_id: u32, filename: &str) -> String {
        self.url_for(&Self::bundle_for(song_id), filename)
    }
}

/// Percent-encodes one path segment. Unreserved characters stay as they are and
/// existing `%` escapes are passed through.
pub fn encode_filename(filename: &str) -> String {
    filename
        .split('%')
        .map(|part| urlencoding::encode(part).into_owned())
        .collect::<Vec<_>>()
        .join("%")
}
