//! Liquidity vacuum: volume, range and spread contraction of the recent
//! third of the lookback against the first two thirds.

use serde::{Deserialize, Serialize};

use super::{DetectError, Detector, DetectorInputs};
use crate::domain::{DetectorFinding, DetectorKind, FindingDetail, Observation};
use crate::stats;

const VOLUME_WEIGHT: f64 = 0.45;
const RANGE_WEIGHT: f64 = 0.35;
const SPREAD_WEIGHT: f64 = 0.20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiquidityParams {
    pub lookback: usize,
    /// Minimum combined score in [0, 10].
    pub min_score: f64,
    /// When set, require a catalyst within this many days of the last
    /// observation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalyst_window_days: Option<u32>,
}

impl Default for LiquidityParams {
    fn default() -> Self {
        Self {
            lookback: 60,
            min_score: 6.0,
            catalyst_window_days: None,
        }
    }
}

/// Contraction measures, each in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct Contraction {
    pub volume: f64,
    pub range: f64,
    /// `None` unless every observation carries a spread.
    pub spread_widening: Option<f64>,
}

impl Contraction {
    pub fn measure(series: &[Observation]) -> Option<Self> {
        if series.len() < 6 {
            return None;
        }
        let split = series.len() * 2 / 3;
        let (base, recent) = series.split_at(split);

        let mean_of = |obs: &[Observation], f: fn(&Observation) -> f64| {
            stats::mean(&obs.iter().map(f).collect::<Vec<_>>())
        };
        let shrink = |before: f64, after: f64| {
            if before > 0.0 {
                (1.0 - after / before).clamp(0.0, 1.0)
            } else {
                0.0
            }
        };

        let volume = shrink(mean_of(base, |o| o.volume), mean_of(recent, |o| o.volume));
        let range = shrink(
            mean_of(base, Observation::range_pct),
            mean_of(recent, Observation::range_pct),
        );
        let spread_widening = series.iter().all(|o| o.spread.is_some()).then(|| {
            let before = mean_of(base, |o| o.spread.unwrap_or(0.0));
            let after = mean_of(recent, |o| o.spread.unwrap_or(0.0));
            if before > 0.0 {
                (after / before - 1.0).clamp(0.0, 1.0)
            } else {
                0.0
            }
        });
        Some(Self {
            volume,
            range,
            spread_widening,
        })
    }

    /// Weighted score in [0, 10]; weights renormalize without spreads.
    pub fn score(&self) -> f64 {
        let core = VOLUME_WEIGHT * self.volume + RANGE_WEIGHT * self.range;
        let combined = match self.spread_widening {
            Some(s) => core + SPREAD_WEIGHT * s,
            None => core / (VOLUME_WEIGHT + RANGE_WEIGHT),
        };
        10.0 * combined
    }
}

impl Detector for LiquidityParams {
    fn kind(&self) -> DetectorKind {
        DetectorKind::LiquidityVacuum
    }

    fn validate(&self) -> Result<(), String> {
        if self.lookback < 6 {
            return Err(format!("lookback {} must be at least 6", self.lookback));
        }
        if !(0.0..=10.0).contains(&self.min_score) {
            return Err(format!("min_score {} outside [0, 10]", self.min_score));
        }
        Ok(())
    }

    fn detect(&self, inputs: &DetectorInputs<'_>) -> Result<Option<DetectorFinding>, DetectError> {
        let symbol = inputs.symbol();
        let series = inputs.series(self.kind(), symbol, self.lookback)?;
        let Some(as_of) = series.last().map(|o| o.date) else {
            return Ok(None);
        };
        let Some(contraction) = Contraction::measure(&series) else {
            return Ok(None);
        };
        let score = contraction.score();
        if score < self.min_score {
            return Ok(None);
        }

        let catalyst = inputs.calendar.next_catalyst(symbol, as_of);
        if let Some(window) = self.catalyst_window_days {
            let within = catalyst.is_some_and(|d| (d - as_of).num_days() <= i64::from(window));
            if !within {
                return Ok(None);
            }
        }

        Ok(Some(DetectorFinding::new(
            vec![symbol.to_string()],
            score,
            FindingDetail::LiquidityVacuum {
                volume_contraction: contraction.volume,
                range_contraction: contraction.range,
                spread_widening: contraction.spread_widening,
                catalyst,
            },
            as_of,
        )))
    }
}
