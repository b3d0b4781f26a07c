//! Contracts for event-sourced domain models.

use crate::error::{DomainError, DomainResult};

/// Minimal identity surface shared by every aggregate.
///
/// Kept deliberately small: how state evolves is each aggregate's own
/// business. This only pins down identity plus a version number for
/// optimistic concurrency.
pub trait AggregateRoot {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;

    /// Number of events applied so far. A freshly constructed aggregate
    /// that has seen no events reports 0.
    fn version(&self) -> u64;
}

/// Pure decision-and-evolution contract.
///
/// `handle` inspects current state and a command and returns the events
/// that should be recorded, without mutating anything. `apply` folds one
/// recorded event into state. Both must stay deterministic and free of IO;
/// the dispatcher owns loading, persistence and publication.
pub trait Aggregate: AggregateRoot {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    /// Fold one event into state, advancing `version` by one.
    fn apply(&mut self, event: &Self::Event);

    /// Decide which events a command produces against the current state.
    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;
}

/// What stream version an append expects to find.
///
/// `Exact` is the normal case: the dispatcher rehydrates, handles the
/// command and appends at the version it loaded, so a concurrent writer on
/// the same room or booking surfaces as a conflict instead of silently
/// interleaving.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// No expectation. For appends that are idempotent by construction.
    Any,
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    /// Like [`matches`](ExpectedVersion::matches), reporting a mismatch as
    /// a [`DomainError::Conflict`].
    pub fn check(self, actual: u64) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "optimistic concurrency check failed (expected: {self:?}, actual: {actual})"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_matches_every_version() {
        for v in [0, 1, 42] {
            assert!(ExpectedVersion::Any.matches(v));
            assert!(ExpectedVersion::Any.check(v).is_ok());
        }
    }

    #[test]
    fn exact_rejects_stale_versions() {
        assert!(ExpectedVersion::Exact(3).matches(3));
        assert!(!ExpectedVersion::Exact(3).matches(4));

        let err = ExpectedVersion::Exact(3).check(2).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }
}
