//! Exactly-once redemption tracking for airdrop claims.
//!
//! Claims are keyed by the leaf digest, not by address alone: the amount is
//! part of the leaf, so the key identifies one allow-list entry exactly.
//! The transition `Unclaimed -> Claimed` is terminal and never reverts.

use std::collections::HashSet;
use xpleb_merkle::Digest;

/// Persistent set of redeemed allow-list leaves.
#[derive(Debug, Clone, Default)]
pub struct ClaimLedger {
    claimed: HashSet<Digest>,
}

impl ClaimLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_claimed(&self, leaf: &Digest) -> bool {
        self.claimed.contains(leaf)
    }

    /// Mark a leaf as redeemed. Returns false if it was already claimed.
    pub fn mark_claimed(&mut self, leaf: Digest) -> bool {
        self.claimed.insert(leaf)
    }

    pub fn claimed_count(&self) -> usize {
        self.claimed.len()
    }
}
