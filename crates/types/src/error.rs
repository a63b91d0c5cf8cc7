use crate::address::Address;
use crate::amount::Amount;
use thiserror::Error;

/// Errors that can occur while settling a claim or a purchase.
///
/// Every variant is a rejection: the call leaves ledger state unchanged and
/// captures no payment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettlementError {
    #[error("merkle proof invalid")]
    InvalidProof,

    #[error("airdrop already claimed")]
    AlreadyClaimed,

    #[error("max bought reached")]
    MaxBoughtReached,

    #[error("paid too little: required {required}, got {paid}")]
    InsufficientPayment { required: Amount, paid: Amount },

    #[error("mint of {requested} items would exceed max supply {max_supply}")]
    SupplyExceeded { requested: u64, max_supply: u64 },

    #[error("caller {0} is not the operator")]
    Unauthorized(Address),

    #[error("invalid sale options: {0}")]
    InvalidOptions(&'static str),

    #[error("insufficient balance for {account}: required {required}, available {available}")]
    InsufficientBalance {
        account: Address,
        required: Amount,
        available: Amount,
    },
}
