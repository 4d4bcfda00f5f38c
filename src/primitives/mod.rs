//! Core compute primitives (Vector, Matrix).
//!
//! Feature batches, standardized inputs and centroids all travel through
//! these two containers.

mod matrix;
mod vector;

pub use matrix::Matrix;
pub use vector::Vector;

/// Rounds `value` to `decimals` places, halves away from zero.
///
/// ```
/// use carbonsense::primitives::round_to;
///
/// assert_eq!(round_to(55.799_999_999_999_99, 2), 55.8);
/// assert_eq!(round_to(0.123_456, 4), 0.1235);
/// ```
#[must_use]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
