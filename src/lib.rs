//! Score Fetcher Library
//!
//! Keeps a local mirror of rhythm-game chart files in sync with a remote asset
//! host. This library exposes the internal modules for testing and reuse by
//! the binaries.

pub mod candidates;
pub mod catalog;
pub mod chart;
pub mod config;
pub mod failure_ledger;
pub mod library;
pub mod pipeline;
pub mod record_store;
pub mod resolver;
pub mod timestamps;
pub mod titles;
pub mod transport;

// Re-export commonly used types for convenience
pub use chart::Difficulty;
pub use config::AppConfig;
pub use pipeline::{Pipeline, RunSummary};
pub use record_store::RecordStore;
