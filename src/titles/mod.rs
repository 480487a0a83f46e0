//! Title normalization for equality checks and asset-name slugs.

mod normalize;

pub use normalize::{
    is_legacy_id, loose_key, pick_asset_title, slugify, strict_key, titles_equal, AssetTitle,
    LEGACY_ID_RANGE,
};
