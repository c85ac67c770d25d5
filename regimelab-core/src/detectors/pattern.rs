//! Pattern similarity against a built-in reference library.
//!
//! The trailing window is resampled to each reference's length and compared
//! on z-scored returns; similarity is `(1 + rho) / 2`.

use serde::{Deserialize, Serialize};

use super::{DetectError, Detector, DetectorInputs};
use crate::domain::{closes, DetectorFinding, DetectorKind, FindingDetail};
use crate::stats;

/// Points per reference shape.
const SHAPE_LEN: usize = 24;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternParams {
    /// Observations in the candidate window.
    pub window: usize,
    /// Minimum similarity in [0, 1] for a finding.
    pub match_threshold: f64,
}

impl Default for PatternParams {
    fn default() -> Self {
        Self {
            window: 60,
            match_threshold: 0.8,
        }
    }
}

/// A named price shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferencePattern {
    pub id: &'static str,
    pub shape: Vec<f64>,
}

/// The built-in library: ascending channel, V recovery, rounding top and
/// breakdown.
pub fn reference_library() -> Vec<ReferencePattern> {
    let n = SHAPE_LEN;
    let mid = (n - 1) as f64 / 2.0;
    let zigzag = [0.0, 0.6, 0.2, -0.4];
    vec![
        ReferencePattern {
            id: "ascending-channel",
            shape: (0..n).map(|i| 0.5 * i as f64 + zigzag[i % 4]).collect(),
        },
        ReferencePattern {
            id: "v-recovery",
            shape: (0..n).map(|i| (i as f64 - mid).abs()).collect(),
        },
        ReferencePattern {
            id: "rounding-top",
            shape: (0..n).map(|i| -(i as f64 - mid).powi(2) / mid).collect(),
        },
        ReferencePattern {
            id: "breakdown",
            shape: (0..n)
                .map(|i| {
                    let i = i as f64;
                    if i < 16.0 {
                        10.0 + 0.3 * (i * 1.7).sin()
                    } else {
                        10.0 - 1.2 * (i - 15.0)
                    }
                })
                .collect(),
        },
    ]
}

/// Similarity in [0, 1] of `candidate` prices to `reference` prices.
pub fn similarity(candidate: &[f64], reference: &[f64]) -> Option<f64> {
    let resampled = stats::resample(candidate, reference.len());
    let a = stats::z_scores(&diffs(&resampled));
    let b = stats::z_scores(&diffs(reference));
    stats::correlation(&a, &b).map(|rho| (1.0 + rho) / 2.0)
}

fn diffs(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

impl Detector for PatternParams {
    fn kind(&self) -> DetectorKind {
        DetectorKind::PatternMatch
    }

    fn validate(&self) -> Result<(), String> {
        if self.window < 5 {
            return Err(format!("window {} must be at least 5", self.window));
        }
        if !(0.0..=1.0).contains(&self.match_threshold) {
            return Err(format!("match_threshold {} outside [0, 1]", self.match_threshold));
        }
        Ok(())
    }

    fn detect(&self, inputs: &DetectorInputs<'_>) -> Result<Option<DetectorFinding>, DetectError> {
        let symbol = inputs.symbol();
        let series = inputs.series(self.kind(), symbol, self.window)?;
        let Some(last) = series.last() else {
            return Ok(None);
        };
        let prices = closes(&series);

        let best = reference_library()
            .into_iter()
            .filter_map(|r| similarity(&prices, &r.shape).map(|s| (r.id, s)))
            .max_by(|a, b| a.1.total_cmp(&b.1));

        Ok(best
            .filter(|(_, sim)| *sim >= self.match_threshold)
            .map(|(id, sim)| {
                DetectorFinding::new(
                    vec![symbol.to_string()],
                    sim * 10.0,
                    FindingDetail::PatternMatch {
                        reference_id: id.to_string(),
                        similarity: sim,
                        window: self.window,
                    },
                    last.date,
                )
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{InMemoryProvider, StandardCalendar};
    use crate::detectors::tests::{profile, series_from};

    #[test]
    fn identical_shape_is_perfect_match() {
        let lib = reference_library();
        let sim = similarity(&lib[1].shape, &lib[1].shape).unwrap();
        assert!((sim - 1.0).abs() < 1e-9);
    }

    #[test]
    fn inverted_shape_is_dissimilar() {
        let lib = reference_library();
        let inverted: Vec<f64> = lib[1].shape.iter().map(|v| -v).collect();
        assert!(similarity(&inverted, &lib[1].shape).unwrap() < 0.1);
    }

    #[test]
    fn v_shaped_window_matches_v_recovery() {
        // 60 closes: fall for 30, recover for 30.
        let closes: Vec<f64> = (0..60)
            .map(|i| 100.0 + (i as f64 - 29.5).abs())
            .collect();
        let provider = InMemoryProvider::new().with_series("AAA", series_from(&closes));
        let calendar = StandardCalendar::new();
        let p = profile("AAA");
        let inputs = DetectorInputs {
            profile: &p,
            market: &provider,
            calendar: &calendar,
            sentiment: None,
        };
        let finding = PatternParams::default().detect(&inputs).unwrap().unwrap();
        match finding.detail {
            FindingDetail::PatternMatch {
                ref reference_id,
                similarity,
                window,
            } => {
                assert_eq!(reference_id, "v-recovery");
                assert!(similarity >= 0.8);
                assert_eq!(window, 60);
            }
            ref other => panic!("unexpected {other:?}"),
        }
        assert!(finding.score >= 8.0);
    }

    #[test]
    fn flat_window_has_no_finding() {
        let provider = InMemoryProvider::new().with_series("AAA", series_from(&[50.0; 60]));
        let calendar = StandardCalendar::new();
        let p = profile("AAA");
        let inputs = DetectorInputs {
            profile: &p,
            market: &provider,
            calendar: &calendar,
            sentiment: None,
        };
        assert!(PatternParams::default().detect(&inputs).unwrap().is_none());
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let p = PatternParams {
            match_threshold: 1.5,
            ..PatternParams::default()
        };
        assert!(p.validate().is_err());
    }
}
