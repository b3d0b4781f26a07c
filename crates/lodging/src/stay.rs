//! Stay periods and the booking lifecycle.
//!
//! `StayPeriod` carries the **only** overlap predicate in the codebase. Every
//! caller that needs to know whether two stays collide (availability search,
//! reservation commit, lifecycle transitions) goes through
//! [`StayPeriod::overlaps`]; nobody re-derives the comparison inline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use stayforge_core::{AggregateId, DomainError, DomainResult, ValueObject};

/// Booking identifier. Bookings live inside a room's stream, so this id names
/// a stay claim, not a separate aggregate.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingId(pub AggregateId);

impl BookingId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for BookingId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Half-open date interval `[check_in, check_out)`.
///
/// The guest occupies the nights from `check_in` up to but not including
/// `check_out`, so a stay ending on a date and a stay starting on that same
/// date share no night and never conflict.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StayPeriod {
    check_in: NaiveDate,
    check_out: NaiveDate,
}

impl ValueObject for StayPeriod {}

impl StayPeriod {
    /// Build a period, rejecting empty or inverted intervals.
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> DomainResult<Self> {
        if check_out <= check_in {
            return Err(DomainError::validation(
                "check-out date must be after check-in date",
            ));
        }
        Ok(Self {
            check_in,
            check_out,
        })
    }

    pub fn check_in(&self) -> NaiveDate {
        self.check_in
    }

    pub fn check_out(&self) -> NaiveDate {
        self.check_out
    }

    /// Number of billable nights. Always at least 1 by construction.
    pub fn nights(&self) -> u32 {
        (self.check_out - self.check_in).num_days() as u32
    }

    /// Canonical half-open overlap test.
    ///
    /// Two periods collide exactly when each starts before the other ends.
    /// Back-to-back periods (one's check-out equals the other's check-in)
    /// do not overlap.
    pub fn overlaps(&self, other: &StayPeriod) -> bool {
        self.check_in < other.check_out && other.check_in < self.check_out
    }
}

impl core::fmt::Display for StayPeriod {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "[{}, {})", self.check_in, self.check_out)
    }
}

/// Lifecycle of a stay claim.
///
/// ```text
/// pending -> confirmed -> checked-in -> completed
///    \           \            \
///     +-----------+------------+--> cancelled
/// ```
///
/// `completed` and `cancelled` are terminal. Walk-ins may enter the ledger
/// directly at `checked-in`. Only `confirmed` and `checked-in` claims hold a
/// room; `pending` claims reserve nothing and never block another booking.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    CheckedIn,
    Completed,
    Cancelled,
}

impl BookingStatus {
    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    /// Active claims are the ones that occupy the room for their period.
    pub fn is_active(&self) -> bool {
        matches!(self, BookingStatus::Confirmed | BookingStatus::CheckedIn)
    }

    /// Whether the lifecycle permits moving from `self` to `target`.
    pub fn can_transition_to(&self, target: BookingStatus) -> bool {
        use BookingStatus::*;
        match (self, target) {
            (Pending, Confirmed) => true,
            (Confirmed, CheckedIn) => true,
            (CheckedIn, Completed) => true,
            (Pending, Cancelled) | (Confirmed, Cancelled) | (CheckedIn, Cancelled) => true,
            _ => false,
        }
    }
}

impl core::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let label = match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::CheckedIn => "checked-in",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}
