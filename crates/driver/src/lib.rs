//! # XPLEB batch distribution driver
//!
//! Operator-side loop that pushes allocations to recipients through the
//! privileged `owner_buy` sale channel. Each allocation is decomposed into
//! bounded-size chunks; every submission carries a fresh, strictly
//! increasing ordering nonce and a fee bid that escalates monotonically on
//! transient rejections. The driver owns no on-ledger state, only local
//! bookkeeping.

pub mod driver;
pub mod endpoint;
pub mod fees;

pub use driver::{
    BatchDriver, DriverConfig, DriverError, JobStatus, RunReport, SubmissionRecord,
};
pub use endpoint::{HttpSaleEndpoint, LocalSaleEndpoint, SaleEndpoint, SubmitError, TxId};
pub use fees::{FeeEstimator, FixedFeeEstimator, HttpFeeEstimator};
