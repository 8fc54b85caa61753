//! Adapter layer: converts between the engine's f64 world and Decimal payouts.

use num_traits::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

/// Convert f64 to Decimal, `None` for NaN, infinities and out-of-range values.
pub fn try_to_decimal(v: f64) -> Option<Decimal> {
    Decimal::from_f64(v)
}

/// Convert Decimal back to f64 for comparison against engine balances.
pub fn from_decimal(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}
