//! RegimeClassifier: one regime label per layer from a window of
//! observations.
//!
//! Pipeline: validate the window, extract [`Features`], score every label
//! with the fixed rule table in [`rules`], then pick primary/secondary and
//! derive strength and confidence from the winning scores.

pub mod features;
pub mod rules;

pub use features::Features;
pub use rules::{LabelScore, MAX_LABEL_SCORE};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{LayerClassification, LayerKind, Observation};

/// Smallest window the classifier accepts.
pub const MIN_LOOKBACK: usize = 5;

#[derive(Debug, Error, PartialEq)]
pub enum ClassifyError {
    #[error("lookback {0} is below the minimum of {MIN_LOOKBACK}")]
    InvalidLookback(usize),

    #[error("insufficient data: need {required} observations, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("void observation at index {index} of the classification window")]
    VoidObservation { index: usize },
}

/// Threshold constants of the rule table.
///
/// Trend thresholds are on R² (discounted by slope significance), volatility
/// thresholds on annualized stdev of log returns, momentum on the fractional
/// change across the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeThresholds {
    pub trend_upper: f64,
    pub trend_lower: f64,
    pub vol_upper: f64,
    pub vol_lower: f64,
    /// Negative fraction; drawdowns deeper than this can signal crisis.
    pub crisis_drawdown: f64,
    pub momentum_threshold: f64,
    pub participation_upper: f64,
    pub participation_lower: f64,
    /// Magnitude of negative lag-1 autocorrelation that scores 1.0 for
    /// mean reversion.
    pub mean_reversion_autocorr: f64,
    /// Runner-up within this fraction of the winner becomes `secondary`.
    pub secondary_band: f64,
}

impl Default for RegimeThresholds {
    fn default() -> Self {
        Self {
            trend_upper: 0.6,
            trend_lower: 0.2,
            vol_upper: 0.35,
            vol_lower: 0.12,
            crisis_drawdown: -0.20,
            momentum_threshold: 0.05,
            participation_upper: 1.3,
            participation_lower: 0.7,
            mean_reversion_autocorr: 0.2,
            secondary_band: 0.15,
        }
    }
}

/// Stateless classifier parameterized by its thresholds.
#[derive(Debug, Clone, Default)]
pub struct RegimeClassifier {
    thresholds: RegimeThresholds,
}

impl RegimeClassifier {
    pub fn new(thresholds: RegimeThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &RegimeThresholds {
        &self.thresholds
    }

    /// Classify `layer` from the trailing `lookback` observations of `series`.
    pub fn classify(
        &self,
        layer: LayerKind,
        series: &[Observation],
        lookback: usize,
    ) -> Result<LayerClassification, ClassifyError> {
        if lookback < MIN_LOOKBACK {
            return Err(ClassifyError::InvalidLookback(lookback));
        }
        if series.len() < lookback {
            return Err(ClassifyError::InsufficientData {
                required: lookback,
                available: series.len(),
            });
        }
        let window = &series[series.len() - lookback..];
        if let Some(index) = window.iter().position(Observation::is_void) {
            return Err(ClassifyError::VoidObservation { index });
        }

        let features = Features::compute(window);
        let ranked = rules::rank(rules::score_labels(&features, &self.thresholds));
        let best = ranked[0];
        let second = ranked[1];

        let secondary = (second.score > 0.0
            && second.score >= best.score * (1.0 - self.thresholds.secondary_band))
            .then_some(second.label);
        let confidence = if best.score > 0.0 {
            ((best.score - second.score) / best.score).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let strength = (best.score / 2.0).clamp(0.0, 1.0);

        Ok(LayerClassification {
            layer,
            primary: best.label,
            secondary,
            strength,
            confidence,
            characteristics: features.to_characteristics(),
            as_of: window[window.len() - 1].date,
        })
    }
}
