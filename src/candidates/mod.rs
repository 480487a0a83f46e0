//! Candidate asset filenames for a song's charts.
//!
//! The host's naming convention changed across content eras and is not derivable
//! from a single metadata field, so each difficulty gets a small ordered list of
//! guesses, tagged with how much they are trusted.

mod generator;
mod overrides;

pub use generator::{infer_base_from_url, Candidate, CandidateGenerator, CandidateTier};
pub use overrides::asset_title_override;
