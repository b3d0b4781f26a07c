//! Stay pricing.
//!
//! All money is handled in integer minor units (e.g., cents). Totals are
//! plain functions of a nightly rate and a stay period; nothing here reads
//! or writes state, so callers decide when a price becomes a snapshot.

use stayforge_core::{DomainError, DomainResult};

use crate::stay::StayPeriod;

/// Billable nights for a stay. Identical to [`StayPeriod::nights`]; exposed
/// as a free function so pricing call sites read as arithmetic.
pub fn nights_between(period: &StayPeriod) -> u32 {
    period.nights()
}

/// Total charge for a stay at the given nightly rate, in minor units.
///
/// `nightly_rate * nights`, rejecting zero rates and arithmetic overflow.
pub fn stay_total(nightly_rate: u64, period: &StayPeriod) -> DomainResult<u64> {
    if nightly_rate == 0 {
        return Err(DomainError::validation("nightly rate must be positive"));
    }

    nightly_rate
        .checked_mul(u64::from(period.nights()))
        .ok_or_else(|| DomainError::validation("stay total overflows minor units"))
}
