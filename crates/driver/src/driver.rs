//! Sequencing and retry state machine for batch distribution runs.

use thiserror::Error;
use tracing::{debug, info, warn};
use xpleb_types::{Address, FeeParams, Quantity};

use crate::endpoint::{SaleEndpoint, SubmitError, TxId};
use crate::fees::FeeEstimator;

/// Driver configuration for one run.
#[derive(Debug, Clone, Copy)]
pub struct DriverConfig {
    /// Largest quantity a single `owner_buy` call may request.
    pub chunk_limit: Quantity,
    /// Attempts per chunk before the run is aborted.
    pub max_attempts: u32,
    /// Fee escalation per retry, in percent.
    pub escalation_percent: u32,
    /// Recipients before this index are skipped (resume after interruption).
    pub start_index: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            chunk_limit: 100,
            max_attempts: 8,
            escalation_percent: 25,
            start_index: 0,
        }
    }
}

/// Lifecycle of one chunk submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Sent,
    Confirmed,
    Retrying(u32),
    Failed,
}

/// One accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRecord {
    pub tx_id: TxId,
    pub recipient: Address,
    pub quantity: Quantity,
    pub nonce: u64,
    /// Attempt index that was accepted (1 = no retries were needed).
    pub attempts: u32,
    pub fee: FeeParams,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub submissions: Vec<SubmissionRecord>,
    pub total_requested: u64,
    pub total_settled: u64,
    pub recipients_settled: usize,
}

/// Fatal driver failures. Partial progress is never rolled back: each
/// settled chunk is independently atomic and final.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error(
        "retries exhausted for {recipient} after {attempts} attempts \
         (quantity {quantity}, last nonce {nonce}): {source}"
    )]
    RetriesExhausted {
        recipient: Address,
        quantity: Quantity,
        nonce: u64,
        attempts: u32,
        source: SubmitError,
    },

    #[error("fatal rejection for {recipient} (quantity {quantity}, nonce {nonce}): {source}")]
    FatalRejection {
        recipient: Address,
        quantity: Quantity,
        nonce: u64,
        source: SubmitError,
    },

    #[error("fee estimation failed for {recipient}: {source}")]
    FeeEstimation {
        recipient: Address,
        source: anyhow::Error,
    },

    #[error("invalid driver configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Single-threaded sequential driver over a recipient list.
///
/// Ordering nonces are strictly increasing for the operator identity and are
/// never reused once handed out, including across retries: a retry consumes
/// a fresh nonce so it cannot collide with an already-accepted submission.
pub struct BatchDriver<E: SaleEndpoint, F: FeeEstimator> {
    endpoint: E,
    fees: F,
    config: DriverConfig,
    next_nonce: u64,
}

impl<E: SaleEndpoint, F: FeeEstimator> BatchDriver<E, F> {
    pub fn new(endpoint: E, fees: F, config: DriverConfig) -> Self {
        Self {
            endpoint,
            fees,
            config,
            next_nonce: 0,
        }
    }

    /// Start nonce allocation at `nonce` (e.g. the operator account's
    /// current transaction count on the remote ledger).
    pub fn with_start_nonce(mut self, nonce: u64) -> Self {
        self.next_nonce = nonce;
        self
    }

    fn reserve_nonce(&mut self) -> u64 {
        let nonce = self.next_nonce;
        self.next_nonce += 1;
        nonce
    }

    /// Drive the full recipient list. The input map is treated as immutable
    /// for the run; recipients before `start_index` are skipped.
    pub fn run(&mut self, recipients: &[(Address, Quantity)]) -> Result<RunReport, DriverError> {
        // A zero chunk limit would decompose every allocation into
        // zero-quantity submissions that never reduce the remaining amount.
        if self.config.chunk_limit == 0 {
            return Err(DriverError::InvalidConfig("chunk_limit must be at least 1"));
        }

        let mut report = RunReport::default();

        for (index, (recipient, amount_requested)) in recipients.iter().enumerate() {
            report.total_requested += amount_requested;
            if index < self.config.start_index {
                info!(index, %recipient, amount_requested, "skipping settled recipient");
                continue;
            }

            let mut amount_remaining = *amount_requested;
            while amount_remaining > 0 {
                let quantity = amount_remaining.min(self.config.chunk_limit);
                let record = self.submit_chunk(
                    index,
                    recipient,
                    quantity,
                    *amount_requested,
                    amount_remaining,
                )?;
                report.total_settled += record.quantity;
                report.submissions.push(record);
                amount_remaining -= quantity;
            }
            report.recipients_settled += 1;
        }

        info!(
            recipients = report.recipients_settled,
            submissions = report.submissions.len(),
            total_settled = report.total_settled,
            "distribution run complete"
        );
        Ok(report)
    }

    /// Submit one chunk, retrying transient rejections with an escalated fee
    /// bid and a fresh nonce. The remaining amount for the recipient is not
    /// decremented on retry.
    fn submit_chunk(
        &mut self,
        index: usize,
        recipient: &Address,
        quantity: Quantity,
        amount_requested: Quantity,
        amount_remaining: Quantity,
    ) -> Result<SubmissionRecord, DriverError> {
        let mut status = JobStatus::Pending;
        debug!(index, %recipient, quantity, ?status, "chunk queued");

        let mut fee = self
            .fees
            .estimate()
            .map_err(|source| DriverError::FeeEstimation {
                recipient: *recipient,
                source,
            })?;

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let nonce = self.reserve_nonce();
            status = JobStatus::Sent;

            info!(
                index,
                %recipient,
                amount_requested,
                amount_remaining,
                quantity,
                attempt,
                nonce,
                ?status,
                max_priority_fee = fee.max_priority_fee,
                max_fee = fee.max_fee,
                "submitting owner_buy"
            );

            match self.endpoint.owner_buy(recipient, quantity, &fee, nonce) {
                Ok(tx_id) => {
                    status = JobStatus::Confirmed;
                    info!(%recipient, quantity, nonce, tx_id, ?status, "submission accepted");
                    return Ok(SubmissionRecord {
                        tx_id,
                        recipient: *recipient,
                        quantity,
                        nonce,
                        attempts: attempt,
                        fee,
                    });
                }
                Err(err) if err.is_transient() && attempt < self.config.max_attempts => {
                    status = JobStatus::Retrying(attempt);
                    warn!(
                        %recipient,
                        quantity,
                        nonce,
                        attempt,
                        ?status,
                        %err,
                        "transient rejection, escalating fee and retrying"
                    );
                    fee = fee.escalated(self.config.escalation_percent);
                }
                Err(err) if err.is_transient() => {
                    status = JobStatus::Failed;
                    warn!(%recipient, quantity, nonce, ?status, %err, "retry budget exhausted");
                    return Err(DriverError::RetriesExhausted {
                        recipient: *recipient,
                        quantity,
                        nonce,
                        attempts: attempt,
                        source: err,
                    });
                }
                Err(err) => {
                    status = JobStatus::Failed;
                    warn!(%recipient, quantity, nonce, ?status, %err, "fatal rejection, aborting run");
                    return Err(DriverError::FatalRejection {
                        recipient: *recipient,
                        quantity,
                        nonce,
                        source: err,
                    });
                }
            }
        }
    }
}
