//! Persistent per-song, per-difficulty download state.
//!
//! The record is the single source of truth for what still needs resolving.
//! It is rewritten wholesale and atomically on every change, so a crash never
//! leaves a half-written file behind.

mod migration;
mod models;
mod store;

pub use migration::CURRENT_SCHEMA_VERSION;
pub use models::{
    DifficultyState, DifficultyStatus, SavedChart, SongRecord, SourceTier,
    UNREADABLE_DIFFICULTIES_KEY,
};
pub use store::{write_atomic, RecordFile, RecordStore, RecordStoreError};
