//! Account balance ledger used to move payment at settlement time.
//!
//! Models the monetary transfer primitive the settlement logic relies on:
//! deterministic credit/debit with explicit insufficient-funds failure.

use std::collections::HashMap;
use xpleb_types::{Address, Amount, SettlementError};

/// Interface for balance ledger operations.
pub trait BalanceLedger: Send + Sync {
    /// Credit an account.
    fn credit(&mut self, account: &Address, amount: Amount);

    /// Debit an account; fails without mutation if funds are insufficient.
    fn debit(&mut self, account: &Address, amount: Amount) -> Result<(), SettlementError>;

    /// Current balance of an account (zero if never seen).
    fn balance_of(&self, account: &Address) -> Amount;
}

/// In-memory balance ledger for the node runtime and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBalanceLedger {
    balances: HashMap<Address, Amount>,
}

impl InMemoryBalanceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account with funds, e.g. the operator before a driver run.
    pub fn with_balance(mut self, account: Address, amount: Amount) -> Self {
        self.credit(&account, amount);
        self
    }
}

impl BalanceLedger for InMemoryBalanceLedger {
    fn credit(&mut self, account: &Address, amount: Amount) {
        let balance = self.balances.entry(*account).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    fn debit(&mut self, account: &Address, amount: Amount) -> Result<(), SettlementError> {
        let available = self.balance_of(account);
        if available < amount {
            return Err(SettlementError::InsufficientBalance {
                account: *account,
                required: amount,
                available,
            });
        }
        self.balances.insert(*account, available - amount);
        Ok(())
    }

    fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }
}

/// Call-recording ledger for deterministic testing.
#[derive(Debug, Clone, Default)]
pub struct MockBalanceLedger {
    inner: InMemoryBalanceLedger,
    credit_calls: Vec<(Address, Amount)>,
    debit_calls: Vec<(Address, Amount)>,
}

impl MockBalanceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balance(mut self, account: Address, amount: Amount) -> Self {
        self.inner = std::mem::take(&mut self.inner).with_balance(account, amount);
        self
    }

    pub fn credit_calls(&self) -> &[(Address, Amount)] {
        &self.credit_calls
    }

    pub fn debit_calls(&self) -> &[(Address, Amount)] {
        &self.debit_calls
    }
}

impl BalanceLedger for MockBalanceLedger {
    fn credit(&mut self, account: &Address, amount: Amount) {
        self.credit_calls.push((*account, amount));
        self.inner.credit(account, amount);
    }

    fn debit(&mut self, account: &Address, amount: Amount) -> Result<(), SettlementError> {
        self.debit_calls.push((*account, amount));
        self.inner.debit(account, amount)
    }

    fn balance_of(&self, account: &Address) -> Amount {
        self.inner.balance_of(account)
    }
}
