//! Per-run log of difficulties that could not be resolved, kept for review.

mod ledger;
pub mod review;

pub use ledger::{
    FailedDifficulty, FailureEntry, FailureLedger, LedgerError, LedgerFile, LEDGER_SCHEMA_VERSION,
};
