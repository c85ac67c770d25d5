//! Average True Range (ATR) with Wilder smoothing.
//!
//! TR[t] = max(high-low, |high-prev_close|, |low-prev_close|).
//! The first observation has no previous close and never seeds the average.

use super::Indicator;
use crate::domain::Observation;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            name: format!("atr_{period}"),
        }
    }
}

/// True range series. TR[0] = high[0] - low[0].
pub fn true_range(series: &[Observation]) -> Vec<f64> {
    let mut tr = Vec::with_capacity(series.len());
    for (i, obs) in series.iter().enumerate() {
        let value = if i == 0 {
            obs.high - obs.low
        } else {
            let pc = series[i - 1].close;
            (obs.high - obs.low)
                .max((obs.high - pc).abs())
                .max((obs.low - pc).abs())
        };
        // f64::max ignores NaN operands, so propagate explicitly.
        let any_nan = obs.high.is_nan() || obs.low.is_nan() || (i > 0 && series[i - 1].close.is_nan());
        tr.push(if any_nan { f64::NAN } else { value });
    }
    tr
}

/// Wilder smoothing (alpha = 1/period), seeded with the mean of the first
/// run of `period` consecutive finite values. A NaN after the seed ends the
/// valid output.
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 || n < period {
        return out;
    }

    let mut run = 0usize;
    let mut seed_end = None;
    for (i, v) in values.iter().enumerate() {
        run = if v.is_finite() { run + 1 } else { 0 };
        if run == period {
            seed_end = Some(i);
            break;
        }
    }
    let Some(seed_end) = seed_end else {
        return out;
    };

    let mut prev = values[seed_end + 1 - period..=seed_end].iter().sum::<f64>() / period as f64;
    out[seed_end] = prev;
    let alpha = 1.0 / period as f64;
    for i in seed_end + 1..n {
        if !values[i].is_finite() {
            break;
        }
        prev = alpha * values[i] + (1.0 - alpha) * prev;
        out[i] = prev;
    }
    out
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, series: &[Observation]) -> Vec<f64> {
        let mut tr = true_range(series);
        if let Some(first) = tr.first_mut() {
            *first = f64::NAN;
        }
        wilder_smooth(&tr, self.period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};
    use chrono::NaiveDate;

    fn ohlc(data: &[(f64, f64, f64, f64)]) -> Vec<Observation> {
        let base = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        data.iter()
            .enumerate()
            .map(|(i, &(open, high, low, close))| Observation {
                date: base + chrono::Duration::days(i as i64),
                open,
                high,
                low,
                close,
                volume: 1000.0,
                spread: None,
            })
            .collect()
    }

    #[test]
    fn true_range_includes_gaps() {
        let series = ohlc(&[(98.0, 102.0, 97.0, 100.0), (110.0, 115.0, 108.0, 112.0)]);
        let tr = true_range(&series);
        assert_approx(tr[0], 5.0, DEFAULT_EPSILON);
        assert_approx(tr[1], 15.0, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_period_3() {
        let series = ohlc(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0), // TR 8
            (106.0, 107.0, 98.0, 99.0),   // TR 9
            (99.0, 103.0, 97.0, 101.0),   // TR 6
            (101.0, 106.0, 100.0, 105.0), // TR 6
        ]);
        let result = Atr::new(3).compute(&series);
        assert!(result[..3].iter().all(|v| v.is_nan()));
        assert_approx(result[3], 23.0 / 3.0, DEFAULT_EPSILON);
        assert_approx(result[4], 64.0 / 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn wilder_smooth_skips_leading_nan() {
        let out = wilder_smooth(&[f64::NAN, 2.0, 4.0, 6.0], 2);
        assert!(out[1].is_nan());
        assert_approx(out[2], 3.0, DEFAULT_EPSILON);
        assert_approx(out[3], 4.5, DEFAULT_EPSILON);
    }

    #[test]
    fn nan_high_propagates() {
        let mut series = ohlc(&[(100.0, 105.0, 95.0, 102.0), (102.0, 108.0, 100.0, 106.0)]);
        series[1].high = f64::NAN;
        assert!(true_range(&series)[1].is_nan());
    }
}
