//! Rate of Change (ROC), as a fraction.
//!
//! ROC[t] = close[t] / close[t-period] - 1

use super::Indicator;
use crate::domain::Observation;

#[derive(Debug, Clone)]
pub struct Roc {
    period: usize,
    name: String,
}

impl Roc {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ROC period must be >= 1");
        Self {
            period,
            name: format!("roc_{period}"),
        }
    }
}

impl Indicator for Roc {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, series: &[Observation]) -> Vec<f64> {
        let mut out = vec![f64::NAN; series.len()];
        for i in self.period..series.len() {
            let base = series[i - self.period].close;
            let curr = series[i].close;
            if base.is_finite() && curr.is_finite() && base != 0.0 {
                out[i] = curr / base - 1.0;
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
    fn roc_fraction() {
        let series = make_series(&[100.0, 110.0, 121.0]);
        let result = Roc::new(2).compute(&series);
        assert!(result[1].is_nan());
        assert_approx(result[2], 0.21, DEFAULT_EPSILON);
    }

    #[test]
    fn roc_negative() {
        let series = make_series(&[100.0, 90.0]);
        assert_approx(Roc::new(1).compute(&series)[1], -0.1, DEFAULT_EPSILON);
    }

    #[test]
    fn roc_nan_propagation() {
        let mut series = make_series(&[100.0, 110.0, 120.0]);
        series[1].close = f64::NAN;
        let result = Roc::new(1).compute(&series);
        assert!(result[1].is_nan());
        assert!(result[2].is_nan());
    }
}
