//! Feature extraction over a classification window.

use std::collections::BTreeMap;

use crate::domain::{closes, Observation};
use crate::indicators::{Atr, Indicator, Roc, Sma};
use crate::stats;

/// Trading days per year, used to annualize volatility.
pub const TRADING_DAYS: f64 = 252.0;

const ATR_PERIOD: usize = 14;
const SMA_PERIOD: usize = 20;

/// Numeric features the rule table reads.
#[derive(Debug, Clone, PartialEq)]
pub struct Features {
    /// R² of log close on time, discounted by slope significance. [0, 1].
    pub trend_strength: f64,
    /// +1, -1 or 0 by slope sign.
    pub trend_direction: f64,
    pub trend_t_stat: f64,
    pub trend_p_value: f64,
    /// Fractional change across the window.
    pub momentum: f64,
    /// Annualized stdev of log returns.
    pub volatility: f64,
    /// Negative fraction.
    pub max_drawdown: f64,
    /// Recent-quarter mean volume over window mean volume.
    pub participation: f64,
    pub autocorrelation: f64,
    pub atr_pct: Option<f64>,
    pub close_vs_sma: Option<f64>,
}

impl Features {
    /// Compute features for the whole of `window`. The caller guarantees at
    /// least five non-void observations.
    pub fn compute(window: &[Observation]) -> Self {
        let prices = closes(window);
        let log_prices: Vec<f64> = prices.iter().map(|p| p.max(f64::MIN_POSITIVE).ln()).collect();
        let x: Vec<f64> = (0..log_prices.len()).map(|i| i as f64).collect();

        let (trend_strength, trend_direction, trend_t_stat, trend_p_value) =
            match stats::ols(&x, &log_prices) {
                Some(fit) => {
                    let t = fit.slope_t();
                    let p = stats::two_sided_p(t, fit.dof() as f64);
                    let direction = if fit.slope > 0.0 {
                        1.0
                    } else if fit.slope < 0.0 {
                        -1.0
                    } else {
                        0.0
                    };
                    (fit.r_squared * (1.0 - p), direction, finite_or_zero(t), p)
                }
                None => (0.0, 0.0, 0.0, 1.0),
            };

        let momentum = Roc::new(window.len() - 1).latest(window).unwrap_or(0.0);

        let returns = stats::log_returns(&prices);
        let volatility = stats::std_dev(&returns) * TRADING_DAYS.sqrt();
        let max_drawdown = stats::max_drawdown(&prices);
        let autocorrelation = stats::autocorrelation_lag1(&returns);

        let volumes: Vec<f64> = window.iter().map(|o| o.volume).collect();
        let recent = (window.len() / 4).max(1);
        let window_mean = stats::mean(&volumes);
        let participation = if window_mean > 0.0 {
            stats::mean(&volumes[volumes.len() - recent..]) / window_mean
        } else {
            1.0
        };

        let last_close = prices[prices.len() - 1];
        let atr_pct = (window.len() > ATR_PERIOD)
            .then(|| Atr::new(ATR_PERIOD).latest(window))
            .flatten()
            .map(|atr| atr / last_close);
        let close_vs_sma = (window.len() >= SMA_PERIOD)
            .then(|| Sma::new(SMA_PERIOD).latest(window))
            .flatten()
            .filter(|sma| *sma > 0.0)
            .map(|sma| last_close / sma - 1.0);

        Self {
            trend_strength,
            trend_direction,
            trend_t_stat,
            trend_p_value,
            momentum,
            volatility,
            max_drawdown,
            participation,
            autocorrelation,
            atr_pct,
            close_vs_sma,
        }
    }

    /// Named view for `LayerClassification::characteristics`.
    pub fn to_characteristics(&self) -> BTreeMap<String, f64> {
        let mut map = BTreeMap::new();
        map.insert("trend_strength".into(), self.trend_strength);
        map.insert("trend_direction".into(), self.trend_direction);
        map.insert("trend_t_stat".into(), self.trend_t_stat);
        map.insert("momentum".into(), self.momentum);
        map.insert("volatility".into(), self.volatility);
        map.insert("max_drawdown".into(), self.max_drawdown);
        map.insert("participation".into(), self.participation);
        map.insert("autocorrelation".into(), self.autocorrelation);
        if let Some(v) = self.atr_pct {
            map.insert("atr_pct".into(), v);
        }
        if let Some(v) = self.close_vs_sma {
            map.insert("close_vs_sma".into(), v);
        }
        map
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else if v.is_nan() {
        0.0
    } else {
        // Perfect fits report a large but serializable t-stat.
        v.signum() * 1e6
    }
}
