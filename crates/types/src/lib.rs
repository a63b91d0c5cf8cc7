//! Shared types for the XPLEB distribution system.
//!
//! Addresses, monetary amounts, fee bids, and the settlement error taxonomy
//! used by both the on-ledger settlement crate and the operator-side driver.

pub mod address;
pub mod amount;
pub mod error;
pub mod fee;

pub use address::{decode_address, encode_address, is_valid_address, Address, AddressError};
pub use amount::{Amount, Quantity};
pub use error::SettlementError;
pub use fee::FeeParams;
