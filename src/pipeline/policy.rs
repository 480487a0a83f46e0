use std::collections::BTreeSet;

use crate::chart::Difficulty;

/// How a miss on the `special` difficulty is classified.
///
/// Many songs never get a special chart, so unless the catalog says one
/// exists a miss is `n/a` rather than a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialPolicy {
    /// The catalog declares special; it is handled like any difficulty.
    Declared,
    /// The catalog lists difficulties without special. One attempt is made
    /// and a miss on the first candidate is `n/a`.
    Undeclared,
    /// The catalog has no difficulty data for the song. Special is assumed
    /// to possibly exist and misses are failures. A policy choice, not an
    /// observed property of the host.
    AssumePresent,
}

impl SpecialPolicy {
    pub fn from_declared(declared: Option<&BTreeSet<Difficulty>>) -> Self {
        match declared {
            Some(set) if set.contains(&Difficulty::Special) => SpecialPolicy::Declared,
            Some(_) => SpecialPolicy::Undeclared,
            None => SpecialPolicy::AssumePresent,
        }
    }

    pub fn records_failures(&self) -> bool {
        !matches!(self, SpecialPolicy::Undeclared)
    }
}
