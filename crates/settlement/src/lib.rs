//! # XPLEB settlement ledger
//!
//! Mint-on-demand settlement for the XPLEB collectible distribution:
//! proof-authenticated airdrop claims and a capped public sale, both feeding
//! one mint sequencer that is the single point of supply-cap truth.
//!
//! Settlement relies on serialized execution: every entry point runs as one
//! critical section under a single mutex, so the cap check-and-increment is
//! race-free by construction.

pub mod balances;
pub mod claims;
pub mod distributor;
pub mod mint;
pub mod sale;

pub use balances::{BalanceLedger, InMemoryBalanceLedger, MockBalanceLedger};
pub use claims::ClaimLedger;
pub use distributor::{Distributor, MintReceipt};
pub use mint::MintSequencer;
pub use sale::{split_revenue, BuyOptions, SaleLedger};
pub use xpleb_types::SettlementError;
