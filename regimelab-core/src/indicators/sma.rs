//! Simple Moving Average (SMA) of closes.
//!
//! First valid value at index period-1. Any NaN close inside a window makes
//! that window's value NaN.

use super::Indicator;
use crate::domain::Observation;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            name: format!("sma_{period}"),
        }
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, series: &[Observation]) -> Vec<f64> {
        let n = series.len();
        let mut out = vec![f64::NAN; n];
        if n < self.period {
            return out;
        }

        let mut sum = 0.0;
        let mut nan_count = 0usize;
        for (i, obs) in series.iter().enumerate() {
            if obs.close.is_nan() {
                nan_count += 1;
            } else {
                sum += obs.close;
            }
            if i >= self.period {
                let leaving = series[i - self.period].close;
                if leaving.is_nan() {
                    nan_count -= 1;
                } else {
                    sum -= leaving;
                }
            }
            if i + 1 >= self.period && nan_count == 0 {
                out[i] = sum / self.period as f64;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_series, DEFAULT_EPSILON};

    #[test]
    fn sma_5_basic() {
        let series = make_series(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0]);
        let result = Sma::new(5).compute(&series);
        assert!(result[..4].iter().all(|v| v.is_nan()));
        assert_approx(result[4], 12.0, DEFAULT_EPSILON);
        assert_approx(result[6], 14.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_nan_window_is_nan() {
        let mut series = make_series(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0]);
        series[2].close = f64::NAN;
        let result = Sma::new(3).compute(&series);
        assert!(result[2].is_nan());
        assert!(result[4].is_nan());
        assert_approx(result[5], 14.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_latest() {
        let series = make_series(&[1.0, 2.0, 3.0]);
        assert_eq!(Sma::new(3).latest(&series), Some(2.0));
        assert_eq!(Sma::new(4).latest(&series), None);
    }
}
