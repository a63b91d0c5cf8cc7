//! Fee bid sources for driver submissions.

use anyhow::{Context, Result};
use serde::Deserialize;
use xpleb_types::{Amount, FeeParams};

/// Source of the per-attempt fee bid.
pub trait FeeEstimator {
    fn estimate(&self) -> Result<FeeParams>;
}

impl FeeEstimator for Box<dyn FeeEstimator> {
    fn estimate(&self) -> Result<FeeParams> {
        (**self).estimate()
    }
}

/// Fixed bid, configured once for the whole run.
#[derive(Debug, Clone, Copy)]
pub struct FixedFeeEstimator {
    fee: FeeParams,
}

impl FixedFeeEstimator {
    pub fn new(max_priority_fee: Amount, max_fee: Amount) -> Self {
        Self {
            fee: FeeParams::new(max_priority_fee, max_fee),
        }
    }
}

impl FeeEstimator for FixedFeeEstimator {
    fn estimate(&self) -> Result<FeeParams> {
        Ok(self.fee)
    }
}

#[derive(Debug, Deserialize)]
struct FeeSourceResponse {
    max_priority_fee: Amount,
    max_fee: Amount,
}

/// External fee-estimation source returning a priority/ceiling pair as JSON.
pub struct HttpFeeEstimator {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpFeeEstimator {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            url: url.into(),
        }
    }
}

impl FeeEstimator for HttpFeeEstimator {
    fn estimate(&self) -> Result<FeeParams> {
        let response: FeeSourceResponse = self
            .client
            .get(&self.url)
            .send()
            .with_context(|| format!("fee source request to {}", self.url))?
            .error_for_status()
            .context("fee source returned an error status")?
            .json()
            .context("decode fee source response")?;

        Ok(FeeParams::new(
            response.max_priority_fee,
            response.max_fee,
        ))
    }
}
