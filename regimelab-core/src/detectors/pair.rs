//! Engle-Granger pair cointegration.
//!
//! OLS of log(a) on log(b) gives the hedge ratio. The residual spread is
//! tested with a zero-lag Dickey-Fuller regression, whose coefficient also
//! gives the AR(1) half-life of mean reversion.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{DetectError, Detector, DetectorInputs};
use crate::domain::{DetectorFinding, DetectorKind, FindingDetail, Observation};
use crate::stats;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairParams {
    /// Partner symbol; defaults to the instrument's sector reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner: Option<String>,
    pub lookback: usize,
    pub min_correlation: f64,
    pub min_zscore: f64,
    /// Days.
    pub max_half_life: f64,
    /// Optional ADF gate; more negative is more stationary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_adf_statistic: Option<f64>,
}

impl Default for PairParams {
    fn default() -> Self {
        Self {
            partner: None,
            lookback: 120,
            min_correlation: 0.7,
            min_zscore: 2.0,
            max_half_life: 30.0,
            max_adf_statistic: None,
        }
    }
}

/// Engle-Granger statistics of one pair.
#[derive(Debug, Clone, PartialEq)]
pub struct PairStatistics {
    pub hedge_ratio: f64,
    /// Infinite when the spread does not mean-revert.
    pub half_life_days: f64,
    /// Current spread z-score.
    pub z_score: f64,
    pub correlation: f64,
    pub adf_statistic: f64,
}

impl PairStatistics {
    /// Compute from two equal-length price series. `None` if degenerate.
    pub fn compute(a: &[f64], b: &[f64]) -> Option<Self> {
        if a.len() != b.len() || a.len() < 10 || a.iter().chain(b).any(|p| *p <= 0.0) {
            return None;
        }
        let la: Vec<f64> = a.iter().map(|p| p.ln()).collect();
        let lb: Vec<f64> = b.iter().map(|p| p.ln()).collect();

        let fit = stats::ols(&lb, &la)?;
        let spread = fit.residuals;

        let lagged = &spread[..spread.len() - 1];
        let delta: Vec<f64> = spread.windows(2).map(|w| w[1] - w[0]).collect();
        let df = stats::ols(lagged, &delta)?;
        let gamma = df.slope;
        let half_life_days = if gamma < 0.0 && gamma > -1.0 {
            -std::f64::consts::LN_2 / (1.0 + gamma).ln()
        } else {
            f64::INFINITY
        };

        let sd = stats::std_dev(&spread);
        let z_score = if sd > 1e-15 {
            (spread[spread.len() - 1] - stats::mean(&spread)) / sd
        } else {
            0.0
        };

        Some(Self {
            hedge_ratio: fit.slope,
            half_life_days,
            z_score,
            correlation: stats::correlation(&la, &lb).unwrap_or(0.0),
            adf_statistic: df.slope_t(),
        })
    }
}

impl PairParams {
    /// Apply the thresholds to precomputed statistics.
    pub fn assess(
        &self,
        symbol: &str,
        partner: &str,
        stats: &PairStatistics,
        as_of: chrono::NaiveDate,
    ) -> Option<DetectorFinding> {
        if stats.correlation < self.min_correlation
            || stats.z_score.abs() < self.min_zscore
            || !(stats.half_life_days <= self.max_half_life)
        {
            return None;
        }
        if let Some(max_adf) = self.max_adf_statistic {
            if !(stats.adf_statistic <= max_adf) {
                return None;
            }
        }
        let z_part = (stats.z_score.abs() / 4.0).min(1.0);
        let decay = 1.0 - 0.5 * stats.half_life_days / self.max_half_life;
        let score = 10.0 * z_part * stats.correlation * decay;
        Some(DetectorFinding::new(
            vec![symbol.to_string(), partner.to_string()],
            score,
            FindingDetail::PairCointegration {
                partner: partner.to_string(),
                hedge_ratio: stats.hedge_ratio,
                half_life_days: stats.half_life_days,
                z_score: stats.z_score,
                correlation: stats.correlation,
                adf_statistic: stats.adf_statistic,
            },
            as_of,
        ))
    }
}

/// Closes of the dates both series share, in date order.
pub(crate) fn align(a: &[Observation], b: &[Observation]) -> (Vec<f64>, Vec<f64>) {
    let b_by_date: BTreeMap<_, f64> = b.iter().map(|o| (o.date, o.close)).collect();
    a.iter()
        .filter_map(|o| b_by_date.get(&o.date).map(|bc| (o.close, *bc)))
        .unzip()
}

impl Detector for PairParams {
    fn kind(&self) -> DetectorKind {
        DetectorKind::PairCointegration
    }

    fn validate(&self) -> Result<(), String> {
        if self.lookback < 20 {
            return Err(format!("lookback {} must be at least 20", self.lookback));
        }
        if !(-1.0..=1.0).contains(&self.min_correlation) {
            return Err(format!("min_correlation {} outside [-1, 1]", self.min_correlation));
        }
        if !(self.min_zscore.is_finite() && self.min_zscore >= 0.0) {
            return Err(format!("min_zscore {} must be >= 0", self.min_zscore));
        }
        if !(self.max_half_life.is_finite() && self.max_half_life > 0.0) {
            return Err(format!("max_half_life {} must be > 0", self.max_half_life));
        }
        Ok(())
    }

    fn detect(&self, inputs: &DetectorInputs<'_>) -> Result<Option<DetectorFinding>, DetectError> {
        let symbol = inputs.symbol();
        let partner = self
            .partner
            .as_deref()
            .unwrap_or(&inputs.profile.sector_reference);
        if partner == symbol {
            return Ok(None);
        }
        let a = inputs.series(self.kind(), symbol, self.lookback)?;
        let b = inputs.series(self.kind(), partner, self.lookback)?;
        let Some(as_of) = a.last().map(|o| o.date) else {
            return Ok(None);
        };
        let (pa, pb) = align(&a, &b);
        Ok(PairStatistics::compute(&pa, &pb).and_then(|s| self.assess(symbol, partner, &s, as_of)))
    }
}
