//! Sale accounting and revenue splitting.

use serde::{Deserialize, Serialize};
use xpleb_types::{Address, Amount, Quantity, SettlementError};

/// Public sale configuration, set by the operator before or during the sale
/// window. Defaults are all-zero, which keeps the sale closed (`max_buyable`
/// of zero rejects every purchase).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyOptions {
    /// Price per item in atomic units.
    pub unit_price: Amount,
    /// Hard cap on units sold across both entry points.
    pub max_buyable: u64,
    /// Sink receiving the burn share of every payment.
    pub burn_sink: Address,
    /// Sink receiving the artist share of every payment.
    pub artist_sink: Address,
    /// Artist share in percent, integer in [0, 100].
    pub artist_percent: u8,
}

impl BuyOptions {
    pub fn validate(&self) -> Result<(), SettlementError> {
        if self.artist_percent > 100 {
            return Err(SettlementError::InvalidOptions(
                "artist_percent must be in [0, 100]",
            ));
        }
        Ok(())
    }
}

/// Split a payment between the artist and burn sinks.
///
/// `artist_share = floor(payment * artist_percent / 100)`; the burn sink
/// gets the remainder, so rounding always favors the burn sink and the two
/// shares sum exactly to the payment.
///
/// The percentage is applied to the quotient and remainder of `payment / 100`
/// separately, which is floor-exact and cannot overflow for any u128 payment.
pub fn split_revenue(payment: Amount, artist_percent: u8) -> (Amount, Amount) {
    let percent = artist_percent.min(100) as u128;
    let artist_share = (payment / 100) * percent + (payment % 100) * percent / 100;
    let burn_share = payment - artist_share;
    (artist_share, burn_share)
}

/// Cumulative sale state against the configured cap.
#[derive(Debug, Clone, Default)]
pub struct SaleLedger {
    options: BuyOptions,
    units_sold: u64,
}

impl SaleLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_options(&mut self, options: BuyOptions) -> Result<(), SettlementError> {
        options.validate()?;
        self.options = options;
        Ok(())
    }

    pub fn options(&self) -> &BuyOptions {
        &self.options
    }

    pub fn units_sold(&self) -> u64 {
        self.units_sold
    }

    /// Fail if selling `quantity` more units would exceed the cap.
    pub fn ensure_cap(&self, quantity: Quantity) -> Result<(), SettlementError> {
        let sold = self
            .units_sold
            .checked_add(quantity)
            .ok_or(SettlementError::MaxBoughtReached)?;
        if sold > self.options.max_buyable {
            return Err(SettlementError::MaxBoughtReached);
        }
        Ok(())
    }

    /// Required payment for `quantity` units at the configured price.
    pub fn required_payment(&self, quantity: Quantity) -> Amount {
        self.options.unit_price.saturating_mul(quantity as u128)
    }

    /// Record a settled sale. Callers must have passed `ensure_cap` first
    /// within the same critical section.
    pub fn record_sale(&mut self, quantity: Quantity) {
        self.units_sold += quantity;
    }
}
