//! Monetary and supply units.
//!
//! All settlement-level monetary values use atomic units (u128); token counts
//! use u64. No floating point is allowed anywhere in settlement or fee math.

/// Amount in atomic monetary units.
pub type Amount = u128;

/// Count of collectible items.
pub type Quantity = u64;
