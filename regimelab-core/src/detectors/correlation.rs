//! Correlation breakdown: long-window vs short-window return correlation
//! against a reference layer.

use serde::{Deserialize, Serialize};

use super::pair::align;
use super::{DetectError, Detector, DetectorInputs};
use crate::domain::{BreakdownDirection, DetectorFinding, DetectorKind, FindingDetail, LayerKind};
use crate::stats;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakdownParams {
    /// Sector or market.
    pub reference: LayerKind,
    pub long_window: usize,
    pub short_window: usize,
    /// Minimum `long - short` correlation drop.
    pub min_breakdown: f64,
}

impl Default for BreakdownParams {
    fn default() -> Self {
        Self {
            reference: LayerKind::Sector,
            long_window: 120,
            short_window: 20,
            min_breakdown: 0.3,
        }
    }
}

/// Correlation drop and direction from aligned prices of the instrument and
/// its reference. `None` when either window is degenerate.
pub fn breakdown(
    instrument: &[f64],
    reference: &[f64],
    long_window: usize,
    short_window: usize,
) -> Option<(f64, f64, BreakdownDirection)> {
    let ri = stats::log_returns(instrument);
    let rr = stats::log_returns(reference);
    if ri.len() < long_window || ri.len() != rr.len() {
        return None;
    }
    let tail = |v: &[f64], n: usize| v[v.len() - n..].to_vec();
    let long = stats::correlation(&tail(&ri, long_window), &tail(&rr, long_window))?;
    let short = stats::correlation(&tail(&ri, short_window), &tail(&rr, short_window))?;

    let ret_i: f64 = tail(&ri, short_window).iter().sum();
    let ret_r: f64 = tail(&rr, short_window).iter().sum();
    let direction = if ret_i >= ret_r {
        BreakdownDirection::Positive
    } else {
        BreakdownDirection::Negative
    };
    Some((long, short, direction))
}

impl Detector for BreakdownParams {
    fn kind(&self) -> DetectorKind {
        DetectorKind::CorrelationBreakdown
    }

    fn validate(&self) -> Result<(), String> {
        if !matches!(self.reference, LayerKind::Sector | LayerKind::Market) {
            return Err(format!("reference must be sector or market, got {}", self.reference));
        }
        if self.short_window < 5 {
            return Err(format!("short_window {} must be at least 5", self.short_window));
        }
        if self.long_window <= self.short_window {
            return Err(format!(
                "long_window {} must exceed short_window {}",
                self.long_window, self.short_window
            ));
        }
        if !(0.0..=2.0).contains(&self.min_breakdown) {
            return Err(format!("min_breakdown {} outside [0, 2]", self.min_breakdown));
        }
        Ok(())
    }

    fn detect(&self, inputs: &DetectorInputs<'_>) -> Result<Option<DetectorFinding>, DetectError> {
        let symbol = inputs.symbol();
        let Some(reference) = inputs.profile.series_symbol(self.reference) else {
            return Ok(None);
        };
        let lookback = self.long_window + 1;
        let a = inputs.series(self.kind(), symbol, lookback)?;
        let b = inputs.series(self.kind(), reference, lookback)?;
        let Some(as_of) = a.last().map(|o| o.date) else {
            return Ok(None);
        };
        let (pa, pb) = align(&a, &b);

        let Some((long, short, direction)) =
            breakdown(&pa, &pb, self.long_window, self.short_window)
        else {
            return Ok(None);
        };
        let drop = long - short;
        if drop < self.min_breakdown {
            return Ok(None);
        }
        Ok(Some(DetectorFinding::new(
            vec![symbol.to_string()],
            drop * 5.0,
            FindingDetail::CorrelationBreakdown {
                reference: reference.to_string(),
                long_correlation: long,
                short_correlation: short,
                drop,
                direction,
            },
            as_of,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{InMemoryProvider, StandardCalendar};
    use crate::detectors::tests::{profile, series_from};

    fn noise(i: usize, k: usize) -> f64 {
        ((i * k) % 97) as f64 / 97.0 * 0.02 - 0.01
    }

    /// Reference walk plus an instrument that copies its returns until the
    /// last `decoupled` days, then follows its own (rising) path.
    fn fixture(decoupled: usize) -> (Vec<f64>, Vec<f64>) {
        let n = 121;
        let mut r = vec![100.0];
        let mut a = vec![50.0];
        for i in 1..n {
            let rr = noise(i, 37);
            r.push(r[i - 1] * (1.0 + rr));
            let ra = if i >= n - decoupled {
                0.004 + noise(i, 53)
            } else {
                rr + 0.1 * noise(i, 53)
            };
            a.push(a[i - 1] * (1.0 + ra));
        }
        (a, r)
    }

    #[test]
    fn coupled_series_have_no_breakdown() {
        let (a, r) = fixture(0);
        let (long, short, _) = breakdown(&a, &r, 120, 20).unwrap();
        assert!(long > 0.9);
        assert!(long - short < 0.3);
    }

    #[test]
    fn decoupled_tail_is_a_positive_breakdown() {
        let (a, r) = fixture(20);
        let (long, short, direction) = breakdown(&a, &r, 120, 20).unwrap();
        assert!(long - short >= 0.3, "long {long} short {short}");
        assert_eq!(direction, BreakdownDirection::Positive);
    }

    #[test]
    fn detector_reports_reference_symbol() {
        let (a, r) = fixture(20);
        let provider = InMemoryProvider::new()
            .with_series("AAA", series_from(&a))
            .with_series("SEC", series_from(&r));
        let calendar = StandardCalendar::new();
        let p = profile("AAA");
        let inputs = DetectorInputs {
            profile: &p,
            market: &provider,
            calendar: &calendar,
            sentiment: None,
        };
        let finding = BreakdownParams::default().detect(&inputs).unwrap().unwrap();
        match finding.detail {
            FindingDetail::CorrelationBreakdown { ref reference, drop, .. } => {
                assert_eq!(reference, "SEC");
                assert!((finding.score - (drop * 5.0).min(10.0)).abs() < 1e-12);
            }
            ref other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_instrument_reference() {
        let p = BreakdownParams {
            reference: LayerKind::Instrument,
            ..BreakdownParams::default()
        };
        assert!(p.validate().is_err());
    }
}
