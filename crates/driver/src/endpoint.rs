//! Sale endpoint abstraction: where the driver submits `owner_buy` calls.
//!
//! The HTTP implementation talks to a remote settlement node; the local one
//! wraps an in-process `Distributor` for dry runs and tests. Both enforce
//! nonce uniqueness the way the real execution layer does.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;
use xpleb_settlement::{BalanceLedger, Distributor};
use xpleb_types::{Address, FeeParams, Quantity};

/// Identifier of an accepted submission.
pub type TxId = String;

/// Rejection returned by a sale endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// The execution layer wants a higher fee bid. Transient.
    #[error("replacement fee too low")]
    FeeTooLow,

    /// The ordering nonce collides with an already-accepted submission.
    /// Transient; the retry must reserve a fresh nonce.
    #[error("nonce {0} conflicts with an accepted submission")]
    NonceConflict(u64),

    /// Settlement-side rejection (cap reached, unauthorized, ...). Fatal:
    /// it indicates a logic or configuration error, not network contention.
    #[error("rejected by settlement: {0}")]
    Rejected(String),

    /// Transport-level failure. Fatal.
    #[error("transport error: {0}")]
    Transport(String),
}

impl SubmitError {
    /// Transient rejections are retried with a fresh fee bid and nonce;
    /// everything else aborts the run.
    pub fn is_transient(&self) -> bool {
        matches!(self, SubmitError::FeeTooLow | SubmitError::NonceConflict(_))
    }
}

/// Privileged sale entry point as seen by the driver.
pub trait SaleEndpoint {
    fn owner_buy(
        &self,
        recipient: &Address,
        quantity: Quantity,
        fee: &FeeParams,
        nonce: u64,
    ) -> Result<TxId, SubmitError>;
}

/// Endpoint over an in-process distributor. Used for dry runs and tests.
///
/// Accepted nonces are remembered for the lifetime of the endpoint so a
/// reused nonce is rejected exactly like the real execution layer would.
pub struct LocalSaleEndpoint<L: BalanceLedger> {
    distributor: std::sync::Arc<Distributor<L>>,
    accepted_nonces: Mutex<HashSet<u64>>,
}

impl<L: BalanceLedger> LocalSaleEndpoint<L> {
    pub fn new(distributor: std::sync::Arc<Distributor<L>>) -> Self {
        Self {
            distributor,
            accepted_nonces: Mutex::new(HashSet::new()),
        }
    }
}

impl<L: BalanceLedger> SaleEndpoint for LocalSaleEndpoint<L> {
    fn owner_buy(
        &self,
        recipient: &Address,
        quantity: Quantity,
        fee: &FeeParams,
        nonce: u64,
    ) -> Result<TxId, SubmitError> {
        {
            let accepted = self.accepted_nonces.lock();
            if accepted.contains(&nonce) {
                return Err(SubmitError::NonceConflict(nonce));
            }
        }

        let operator = self.distributor.operator();
        self.distributor
            .owner_buy(operator, *recipient, quantity)
            .map_err(|err| SubmitError::Rejected(err.to_string()))?;

        self.accepted_nonces.lock().insert(nonce);
        let tx_id = derive_tx_id(recipient, quantity, fee, nonce);
        debug!(%recipient, quantity, nonce, tx_id, "local owner_buy settled");
        Ok(tx_id)
    }
}

fn derive_tx_id(recipient: &Address, quantity: Quantity, fee: &FeeParams, nonce: u64) -> TxId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(recipient.as_bytes());
    hasher.update(&quantity.to_le_bytes());
    hasher.update(&fee.max_priority_fee.to_le_bytes());
    hasher.update(&fee.max_fee.to_le_bytes());
    hasher.update(&nonce.to_le_bytes());
    format!("0x{}", hex::encode(hasher.finalize().as_bytes()))
}

#[derive(Serialize)]
struct OwnerBuyRequest<'a> {
    recipient: &'a Address,
    quantity: Quantity,
    max_priority_fee: u128,
    max_fee: u128,
    nonce: u64,
}

#[derive(Deserialize)]
struct OwnerBuyResponse {
    tx_hash: TxId,
}

#[derive(Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: String,
}

/// Endpoint over a remote settlement node's RPC.
pub struct HttpSaleEndpoint {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpSaleEndpoint {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn classify_rejection(nonce: u64, body: &str) -> SubmitError {
        // The execution layer reports fee and ordering conflicts as plain
        // strings, so classification is a substring match.
        let reason = serde_json::from_str::<ErrorResponse>(body)
            .map(|resp| resp.error)
            .unwrap_or_else(|_| body.to_string());

        // Only the two ordering-conflict phrases are transient; any other
        // message mentioning a nonce is a settlement rejection.
        if reason.contains("replacement fee too low") {
            SubmitError::FeeTooLow
        } else if reason.contains("nonce too low") || reason.contains("nonce conflict") {
            SubmitError::NonceConflict(nonce)
        } else {
            SubmitError::Rejected(reason)
        }
    }
}

impl SaleEndpoint for HttpSaleEndpoint {
    fn owner_buy(
        &self,
        recipient: &Address,
        quantity: Quantity,
        fee: &FeeParams,
        nonce: u64,
    ) -> Result<TxId, SubmitError> {
        let url = format!("{}/owner_buy", self.base_url.trim_end_matches('/'));
        let request = OwnerBuyRequest {
            recipient,
            quantity,
            max_priority_fee: fee.max_priority_fee,
            max_fee: fee.max_fee,
            nonce,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .map_err(|err| SubmitError::Transport(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let accepted: OwnerBuyResponse = response
                .json()
                .map_err(|err| SubmitError::Transport(err.to_string()))?;
            return Ok(accepted.tx_hash);
        }

        let body = response.text().unwrap_or_default();
        Err(Self::classify_rejection(nonce, &body))
    }
}
