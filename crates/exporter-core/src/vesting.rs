//! Vesting schedule arithmetic
//!
//! Mirrors the Cosmos SDK `x/auth/vesting` rules for the three schedule kinds.
//! All amounts are in a single denomination and times are unix seconds.

use crate::chain::{AccountKind, VestingSchedule};
use crate::coin::amount_of;

/// Vesting state of an account in one denomination
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VestingAmounts {
    /// Still locked and not delegated (after the delegated-vesting clamp)
    pub vesting: u128,
    /// Already released
    pub vested: u128,
}

/// Locked amount net of the part currently delegated; never negative
pub fn clamp_vesting(vesting: u128, delegated_vesting: u128) -> u128 {
    if vesting >= delegated_vesting {
        vesting - delegated_vesting
    } else {
        0
    }
}

fn delayed_vested(s: &VestingSchedule, denom: &str, now: i64) -> u128 {
    if now < s.end_time {
        0
    } else {
        amount_of(&s.original_vesting, denom)
    }
}

fn continuous_vested(s: &VestingSchedule, denom: &str, now: i64) -> u128 {
    let original = amount_of(&s.original_vesting, denom);
    if now <= s.start_time {
        return 0;
    }
    if now >= s.end_time || s.end_time <= s.start_time {
        return original;
    }
    let elapsed = (now - s.start_time) as u128;
    let duration = (s.end_time - s.start_time) as u128;
    original.saturating_mul(elapsed) / duration
}

fn periodic_vested(s: &VestingSchedule, denom: &str, now: i64) -> u128 {
    if now < s.start_time {
        return 0;
    }
    if now >= s.end_time {
        return amount_of(&s.original_vesting, denom);
    }
    let mut vested = 0u128;
    let mut period_start = s.start_time;
    for period in &s.periods {
        if now - period_start < period.length {
            break;
        }
        vested = vested.saturating_add(amount_of(&period.amount, denom));
        period_start += period.length;
    }
    vested
}

impl AccountKind {
    /// Vesting and vested amounts at `now`; `None` for non-vesting kinds
    pub fn vesting_amounts(&self, denom: &str, now: i64) -> Option<VestingAmounts> {
        let (schedule, vested) = match self {
            Self::ContinuousVesting(s) => (s, continuous_vested(s, denom, now)),
            Self::DelayedVesting(s) => (s, delayed_vested(s, denom, now)),
            Self::PeriodicVesting(s) => (s, periodic_vested(s, denom, now)),
            _ => return None,
        };
        let original = amount_of(&schedule.original_vesting, denom);
        let locked = original.saturating_sub(vested);
        let delegated = amount_of(&schedule.delegated_vesting, denom);
        Some(VestingAmounts {
            vesting: clamp_vesting(locked, delegated),
            vested,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::VestingPeriod;
    use crate::coin::Coin;
    use proptest::prelude::*;

    fn schedule(start: i64, end: i64, original: u128, delegated: u128) -> VestingSchedule {
        VestingSchedule {
            original_vesting: vec![Coin::new("ucore", original)],
            delegated_vesting: vec![Coin::new("ucore", delegated)],
            start_time: start,
            end_time: end,
            periods: Vec::new(),
        }
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp_vesting(100, 30), 70);
        assert_eq!(clamp_vesting(30, 30), 0);
        assert_eq!(clamp_vesting(10, 30), 0);
    }

    #[test]
    fn test_continuous_halfway() {
        let kind = AccountKind::ContinuousVesting(schedule(1000, 2000, 1000, 0));
        let a = kind.vesting_amounts("ucore", 1500).unwrap();
        assert_eq!(a, VestingAmounts { vesting: 500, vested: 500 });
        let end = kind.vesting_amounts("ucore", 5000).unwrap();
        assert_eq!(end, VestingAmounts { vesting: 0, vested: 1000 });
    }

    #[test]
    fn test_delayed_releases_at_end() {
        let kind = AccountKind::DelayedVesting(schedule(0, 2000, 1000, 400));
        assert_eq!(
            kind.vesting_amounts("ucore", 1999).unwrap(),
            VestingAmounts { vesting: 600, vested: 0 }
        );
        assert_eq!(
            kind.vesting_amounts("ucore", 2000).unwrap(),
            VestingAmounts { vesting: 0, vested: 1000 }
        );
    }

    #[test]
    fn test_periodic_counts_completed_periods() {
        let mut s = schedule(1000, 1300, 300, 0);
        s.periods = (0..3)
            .map(|_| VestingPeriod {
                length: 100,
                amount: vec![Coin::new("ucore", 100)],
            })
            .collect();
        let kind = AccountKind::PeriodicVesting(s);
        assert_eq!(kind.vesting_amounts("ucore", 1099).unwrap().vested, 0);
        assert_eq!(kind.vesting_amounts("ucore", 1100).unwrap().vested, 100);
        assert_eq!(kind.vesting_amounts("ucore", 1250).unwrap().vested, 200);
    }

    #[test]
    fn test_base_account_has_no_schedule() {
        assert!(AccountKind::Base.vesting_amounts("ucore", 0).is_none());
        assert!(AccountKind::Module.vesting_amounts("ucore", 0).is_none());
    }

    proptest! {
        #[test]
        fn prop_clamp_never_exceeds_vesting(v in 0u128..u64::MAX as u128, d in 0u128..u64::MAX as u128) {
            let clamped = clamp_vesting(v, d);
            prop_assert!(clamped <= v);
            if v >= d {
                prop_assert_eq!(clamped + d, v);
            } else {
                prop_assert_eq!(clamped, 0);
            }
        }

        #[test]
        fn prop_continuous_vested_monotonic(t1 in 0i64..3000, t2 in 0i64..3000) {
            let kind = AccountKind::ContinuousVesting(schedule(1000, 2000, 1_000_000, 0));
            let (lo, hi) = if t1 <= t2 { (t1, t2) } else { (t2, t1) };
            let a = kind.vesting_amounts("ucore", lo).unwrap();
            let b = kind.vesting_amounts("ucore", hi).unwrap();
            prop_assert!(a.vested <= b.vested);
            prop_assert_eq!(b.vesting + b.vested, 1_000_000);
        }
    }
}
