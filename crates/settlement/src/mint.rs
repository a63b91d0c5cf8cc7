//! Mint sequencing against the global supply cap.
//!
//! One monotonically increasing counter shared by both settlement channels.
//! Identifiers are contiguous from 0, never reassigned, never reused.

use std::collections::HashMap;
use xpleb_types::{Address, Quantity, SettlementError};

/// Item identifier.
pub type ItemId = u64;

#[derive(Debug, Clone, Default)]
pub struct MintSequencer {
    next_id: ItemId,
    max_supply: u64,
    owners: HashMap<ItemId, Address>,
    holdings: HashMap<Address, u64>,
}

impl MintSequencer {
    pub fn new(max_supply: u64) -> Self {
        Self {
            max_supply,
            ..Self::default()
        }
    }

    pub fn set_max_supply(&mut self, max_supply: u64) {
        self.max_supply = max_supply;
    }

    pub fn max_supply(&self) -> u64 {
        self.max_supply
    }

    /// Items minted so far; also the next identifier to be assigned.
    pub fn total_supply(&self) -> u64 {
        self.next_id
    }

    pub fn owner_of(&self, id: ItemId) -> Option<&Address> {
        self.owners.get(&id)
    }

    pub fn balance_of(&self, owner: &Address) -> u64 {
        self.holdings.get(owner).copied().unwrap_or(0)
    }

    /// Check that `quantity` more items fit under the supply cap.
    ///
    /// Checked independently of the sale cap: the two caps are configured
    /// separately and may be set inconsistently.
    pub fn ensure_capacity(&self, quantity: Quantity) -> Result<(), SettlementError> {
        let end = self
            .next_id
            .checked_add(quantity)
            .ok_or(SettlementError::SupplyExceeded {
                requested: quantity,
                max_supply: self.max_supply,
            })?;
        if end > self.max_supply {
            return Err(SettlementError::SupplyExceeded {
                requested: quantity,
                max_supply: self.max_supply,
            });
        }
        Ok(())
    }

    /// Assign `quantity` consecutive identifiers to `to`, returning the first.
    pub fn mint(&mut self, to: &Address, quantity: Quantity) -> Result<ItemId, SettlementError> {
        self.ensure_capacity(quantity)?;

        let first = self.next_id;
        for id in first..first + quantity {
            self.owners.insert(id, *to);
        }
        self.next_id = first + quantity;
        *self.holdings.entry(*to).or_insert(0) += quantity;

        Ok(first)
    }
}
