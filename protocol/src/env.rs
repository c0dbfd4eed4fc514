//! # Call Environment
//!
//! REPLICA assumes an external, trusted execution environment that
//! provides atomic state transitions, a shared monotonic clock,
//! authenticated caller identity per call, and irreversible value
//! transfer. This module is the boundary type for that assumption: every
//! mutating contract entry point takes a [`CallContext`] built by the
//! host, never reads a wall clock or an ambient "current user" itself.
//!
//! Keeping the clock out of the contracts is also what makes the time
//! window and expiry logic testable without sleeping in tests.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::keys::Address;

/// The per-call environment handed down by the host runtime.
///
/// One `CallContext` describes exactly one operation: who is calling,
/// what the shared clock reads, and how much native value rides along
/// with the call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallContext {
    /// The authenticated caller identity. The host has already verified
    /// that the caller controls this address; contracts trust it.
    pub caller: Address,
    /// The shared clock reading for this operation. Monotonic across
    /// operations as admitted to the ledger.
    pub now: DateTime<Utc>,
    /// Native value attached to the call, in the smallest denomination.
    /// Zero for calls that don't move money.
    pub value: u64,
}

impl CallContext {
    /// Context for a call with no attached value.
    pub fn new(caller: impl Into<Address>, now: DateTime<Utc>) -> Self {
        Self {
            caller: caller.into(),
            now,
            value: 0,
        }
    }

    /// Attach native value to the call.
    pub fn with_value(mut self, value: u64) -> Self {
        self.value = value;
        self
    }
}

/// Add `secs` to `instant`, saturating at the maximum representable time.
///
/// Copy-token expiries must never wrap: a collector buying a very long
/// duration gets "effectively forever", not an expiry in 1970.
pub fn saturating_add_secs(instant: DateTime<Utc>, secs: u64) -> DateTime<Utc> {
    // TimeDelta holds milliseconds internally, so seconds well below
    // i64::MAX can still be unrepresentable. try_seconds covers both.
    let delta = i64::try_from(secs).ok().and_then(TimeDelta::try_seconds);
    match delta {
        Some(delta) => instant
            .checked_add_signed(delta)
            .unwrap_or(DateTime::<Utc>::MAX_UTC),
        None => DateTime::<Utc>::MAX_UTC,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_builder() {
        let now = Utc::now();
        let ctx = CallContext::new("alice", now).with_value(500);
        assert_eq!(ctx.caller, "alice");
        assert_eq!(ctx.value, 500);
        assert_eq!(ctx.now, now);
    }

    #[test]
    fn add_secs_normal_case() {
        let now = Utc::now();
        let later = saturating_add_secs(now, 3600);
        assert_eq!((later - now).num_seconds(), 3600);
    }

    #[test]
    fn add_secs_saturates_at_max() {
        let now = Utc::now();
        assert_eq!(saturating_add_secs(now, u64::MAX), DateTime::<Utc>::MAX_UTC);
        // Fits in i64 as seconds but not in TimeDelta's millisecond
        // representation; must saturate, not panic.
        assert_eq!(
            saturating_add_secs(now, 10_000_000_000_000_000),
            DateTime::<Utc>::MAX_UTC
        );
        // Representable as a TimeDelta but past chrono's date range.
        assert_eq!(
            saturating_add_secs(now, 9_000_000_000_000),
            DateTime::<Utc>::MAX_UTC
        );
    }

    #[test]
    fn add_secs_zero_is_identity() {
        let now = Utc::now();
        assert_eq!(saturating_add_secs(now, 0), now);
    }
}
