//! Fee bids for transaction submission.
//!
//! A bid carries a priority fee and a ceiling fee, both in atomic units.
//! Escalation is monotonic so a retried submission never bids below the
//! rejected one.

use crate::amount::Amount;
use serde::{Deserialize, Serialize};

/// Fee bid attached to a driver submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeParams {
    /// Priority fee offered to the execution layer (atomic units).
    pub max_priority_fee: Amount,
    /// Absolute ceiling the submitter is willing to pay (atomic units).
    pub max_fee: Amount,
}

impl FeeParams {
    pub fn new(max_priority_fee: Amount, max_fee: Amount) -> Self {
        Self {
            max_priority_fee,
            max_fee,
        }
    }

    /// Return a bid escalated by `percent`, rounded up so escalation always
    /// makes progress even for tiny base fees.
    pub fn escalated(&self, percent: u32) -> Self {
        Self {
            max_priority_fee: escalate(self.max_priority_fee, percent),
            max_fee: escalate(self.max_fee, percent),
        }
    }

    /// True if every field of `self` is at least as high as in `other`.
    pub fn dominates(&self, other: &FeeParams) -> bool {
        self.max_priority_fee >= other.max_priority_fee && self.max_fee >= other.max_fee
    }
}

fn escalate(fee: Amount, percent: u32) -> Amount {
    let bump = fee
        .saturating_mul(percent as u128)
        .div_euclid(100)
        .max(1);
    fee.saturating_add(bump)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escalation_is_monotonic() {
        let base = FeeParams::new(150, 300);
        let next = base.escalated(20);
        assert!(next.dominates(&base));
        assert_eq!(next.max_priority_fee, 180);
        assert_eq!(next.max_fee, 360);
    }

    #[test]
    fn escalation_progresses_on_tiny_fees() {
        // 1% of 10 floors to 0; the bump must still be at least 1.
        let base = FeeParams::new(10, 10);
        let next = base.escalated(1);
        assert_eq!(next.max_priority_fee, 11);
        assert_eq!(next.max_fee, 11);
    }

    #[test]
    fn repeated_escalation_compounds() {
        let mut fee = FeeParams::new(100, 200);
        for _ in 0..3 {
            let next = fee.escalated(50);
            assert!(next.max_fee > fee.max_fee);
            fee = next;
        }
        assert_eq!(fee.max_fee, 675);
    }
}
