//! Technical indicator implementations.
//!
//! Pure functions over closing prices ordered oldest to newest.

pub mod rsi;
pub mod sma;

pub use rsi::rsi;
pub use sma::moving_average;

/// Percentage distance of `price` from `ma`: `(price - ma) / ma * 100`.
///
/// Undefined (`None`) when `ma` is zero or either input is not finite.
pub fn deviation_pct(price: f64, ma: f64) -> Option<f64> {
    if ma == 0.0 || !ma.is_finite() || !price.is_finite() {
        return None;
    }
    Some((price - ma) / ma * 100.0)
}
