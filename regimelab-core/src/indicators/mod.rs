//! Indicators used as classifier features.
//!
//! Indicators are pure functions: observation history in, numeric series out.
//! Each output series has the same length as the input, with `f64::NAN`
//! during warmup.

pub mod atr;
pub mod roc;
pub mod sma;

pub use atr::{true_range, wilder_smooth, Atr};
pub use roc::Roc;
pub use sma::Sma;

use crate::domain::Observation;

/// Trait for indicators.
///
/// # Look-ahead guard
/// No value at index t may depend on observations after t.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_20", "atr_14").
    fn name(&self) -> &str;

    /// Number of observations needed before output is valid.
    fn lookback(&self) -> usize;

    /// Compute the indicator over the whole series.
    fn compute(&self, series: &[Observation]) -> Vec<f64>;

    /// Most recent valid value, if any.
    fn latest(&self, series: &[Observation]) -> Option<f64> {
        self.compute(series).last().copied().filter(|v| v.is_finite())
    }
}

/// Synthetic observations from close prices for testing.
///
/// open = previous close (or close for the first), high/low = ±1.0 around
/// the body, volume = 1000.
#[cfg(test)]
pub fn make_series(closes: &[f64]) -> Vec<Observation> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Observation {
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
                spread: None,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
