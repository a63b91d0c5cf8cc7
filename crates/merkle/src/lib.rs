//! Allow-list commitment trees for the XPLEB airdrop.
//!
//! A binary SHA-256 hash tree is built over `(address, amount)` entries.
//! Pairs are hashed in sorted order (smaller digest first), so a proof is
//! just an unordered-position sequence of sibling digests and verification
//! needs no index bookkeeping. The same canonicalization is applied at
//! construction and at verification; this is a protocol contract shared with
//! whoever published the root, not an implementation detail.

use anyhow::{anyhow, Result};
use sha2::{Digest as _, Sha256};
use xpleb_types::{Address, Amount};

/// A 32-byte node digest.
pub type Digest = [u8; 32];

/// The all-zero digest, used by the settlement layer as the "no commitment
/// published" sentinel. A genuine tree can never produce it.
pub const ZERO_DIGEST: Digest = [0u8; 32];

/// Hash one allow-list entry into its leaf digest.
///
/// Encoding is `address bytes || amount as 16-byte big-endian`, then SHA-256.
/// The amount is part of the leaf, so claiming a different amount than the
/// one allotted yields a digest that is simply not in the tree.
pub fn leaf_digest(address: &Address, amount: Amount) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(address.as_bytes());
    hasher.update(amount.to_be_bytes());
    hasher.finalize().into()
}

/// Hash an interior pair with sorted-order canonicalization.
fn pair_digest(a: &Digest, b: &Digest) -> Digest {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let mut hasher = Sha256::new();
    hasher.update(lo);
    hasher.update(hi);
    hasher.finalize().into()
}

/// Verify that `(address, amount)` is a leaf of the tree committed to by
/// `root`, given the ordered sibling digests in `proof`.
///
/// Pure function; no side effects. An empty proof verifies only for a
/// single-leaf tree (the leaf is the root).
pub fn verify(root: &Digest, address: &Address, amount: Amount, proof: &[Digest]) -> bool {
    let mut current = leaf_digest(address, amount);
    for sibling in proof {
        current = pair_digest(&current, sibling);
    }
    current == *root
}

/// Allow-list commitment tree.
///
/// Built once over the full entry list; yields the root to publish and a
/// proof per entry. An odd node at any level is promoted to the next level
/// unhashed, which keeps proofs free of duplicate-sibling entries.
pub struct AllowListTree {
    entries: Vec<(Address, Amount)>,
    levels: Vec<Vec<Digest>>,
}

impl AllowListTree {
    /// Build a tree over the given entries. Fails on an empty list.
    pub fn new(entries: Vec<(Address, Amount)>) -> Result<Self> {
        if entries.is_empty() {
            return Err(anyhow!("cannot build a commitment over an empty allow-list"));
        }

        let leaves: Vec<Digest> = entries
            .iter()
            .map(|(address, amount)| leaf_digest(address, *amount))
            .collect();

        let mut levels = vec![leaves];
        while levels.last().map(Vec::len).unwrap_or(0) > 1 {
            let current = levels.last().unwrap();
            let mut next = Vec::with_capacity(current.len().div_ceil(2));
            for pair in current.chunks(2) {
                match pair {
                    [left, right] => next.push(pair_digest(left, right)),
                    [odd] => next.push(*odd),
                    _ => unreachable!(),
                }
            }
            levels.push(next);
        }

        Ok(Self { entries, levels })
    }

    /// The root digest to publish as the allow-list commitment.
    pub fn root(&self) -> Digest {
        self.levels.last().unwrap()[0]
    }

    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    /// Sibling path for the given entry, or None if it is not in the tree.
    ///
    /// Both address and amount must match the entry used at construction.
    pub fn proof_for(&self, address: &Address, amount: Amount) -> Option<Vec<Digest>> {
        let index = self
            .entries
            .iter()
            .position(|(a, amt)| a == address && *amt == amount)?;
        Some(self.proof_at(index))
    }

    fn proof_at(&self, leaf_index: usize) -> Vec<Digest> {
        let mut proof = Vec::new();
        let mut index = leaf_index;

        for level in &self.levels[..self.levels.len() - 1] {
            let sibling = if index % 2 == 0 { index + 1 } else { index - 1 };
            if sibling < level.len() {
                proof.push(level[sibling]);
            }
            index /= 2;
        }

        proof
    }
}
