//! Detector findings: typed outputs of the statistical detectors.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound of a finding score.
pub const MAX_FINDING_SCORE: f64 = 10.0;

/// The five detectors. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectorKind {
    PatternMatch,
    PairCointegration,
    CorrelationBreakdown,
    LiquidityVacuum,
    SentimentDivergence,
}

impl DetectorKind {
    pub const ALL: [DetectorKind; 5] = [
        DetectorKind::PatternMatch,
        DetectorKind::PairCointegration,
        DetectorKind::CorrelationBreakdown,
        DetectorKind::LiquidityVacuum,
        DetectorKind::SentimentDivergence,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PatternMatch => "pattern-match",
            Self::PairCointegration => "pair-cointegration",
            Self::CorrelationBreakdown => "correlation-breakdown",
            Self::LiquidityVacuum => "liquidity-vacuum",
            Self::SentimentDivergence => "sentiment-divergence",
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a correlation breakdown relative to the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BreakdownDirection {
    /// Instrument decoupled upward (outperformed the reference).
    Positive,
    /// Instrument decoupled downward.
    Negative,
}

/// Sentiment-vs-price disagreement type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SentimentDirection {
    /// Negative sentiment, rising price.
    Bullish,
    /// Positive sentiment, falling price.
    Bearish,
}

/// Kind-specific finding metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum FindingDetail {
    PatternMatch {
        reference_id: String,
        similarity: f64,
        window: usize,
    },
    PairCointegration {
        partner: String,
        hedge_ratio: f64,
        half_life_days: f64,
        z_score: f64,
        correlation: f64,
        adf_statistic: f64,
    },
    CorrelationBreakdown {
        reference: String,
        long_correlation: f64,
        short_correlation: f64,
        drop: f64,
        direction: BreakdownDirection,
    },
    LiquidityVacuum {
        volume_contraction: f64,
        range_contraction: f64,
        spread_widening: Option<f64>,
        catalyst: Option<NaiveDate>,
    },
    SentimentDivergence {
        sentiment: f64,
        price_signal: f64,
        divergence: f64,
        direction: SentimentDirection,
    },
}

impl FindingDetail {
    pub fn kind(&self) -> DetectorKind {
        match self {
            Self::PatternMatch { .. } => DetectorKind::PatternMatch,
            Self::PairCointegration { .. } => DetectorKind::PairCointegration,
            Self::CorrelationBreakdown { .. } => DetectorKind::CorrelationBreakdown,
            Self::LiquidityVacuum { .. } => DetectorKind::LiquidityVacuum,
            Self::SentimentDivergence { .. } => DetectorKind::SentimentDivergence,
        }
    }
}

/// A single detector's assertion of a named statistical condition.
///
/// Scores are normalized to [0, 10] so the scan engine can weight findings
/// of different kinds against each other. Signed quantities live in `detail`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorFinding {
    /// Instruments the finding concerns (two for pair findings).
    pub instruments: Vec<String>,
    pub score: f64,
    pub detail: FindingDetail,
    pub as_of: NaiveDate,
}

impl DetectorFinding {
    pub fn new(instruments: Vec<String>, score: f64, detail: FindingDetail, as_of: NaiveDate) -> Self {
        let score = if score.is_nan() {
            0.0
        } else {
            score.clamp(0.0, MAX_FINDING_SCORE)
        };
        Self {
            instruments,
            score,
            detail,
            as_of,
        }
    }

    pub fn kind(&self) -> DetectorKind {
        self.detail.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
    }

    #[test]
    fn score_is_clamped() {
        let detail = FindingDetail::PatternMatch {
            reference_id: "v-recovery".into(),
            similarity: 0.9,
            window: 30,
        };
        let f = DetectorFinding::new(vec!["AAPL".into()], 14.0, detail.clone(), date());
        assert_eq!(f.score, 10.0);
        let f = DetectorFinding::new(vec!["AAPL".into()], f64::NAN, detail, date());
        assert_eq!(f.score, 0.0);
    }

    #[test]
    fn detail_kind_matches_variant() {
        let detail = FindingDetail::SentimentDivergence {
            sentiment: -0.6,
            price_signal: 0.4,
            divergence: 0.5,
            direction: SentimentDirection::Bullish,
        };
        assert_eq!(detail.kind(), DetectorKind::SentimentDivergence);
    }

    #[test]
    fn detail_is_tagged_by_kind() {
        let detail = FindingDetail::CorrelationBreakdown {
            reference: "XLK".into(),
            long_correlation: 0.8,
            short_correlation: 0.1,
            drop: 0.7,
            direction: BreakdownDirection::Negative,
        };
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["kind"], "correlation-breakdown");
        assert_eq!(json["direction"], "negative");
    }
}
