//! Fixed rule table: normalized features in, one score per label out.

use crate::domain::RegimeLabel;

use super::features::Features;
use super::RegimeThresholds;

/// Upper bound of any single label score.
pub const MAX_LABEL_SCORE: f64 = 4.0;

/// Score assigned to `Neutral` regardless of features.
pub const NEUTRAL_BASELINE: f64 = 0.5;

/// Score for one label plus the feature magnitude used to break ties.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelScore {
    pub label: RegimeLabel,
    pub score: f64,
    pub magnitude: f64,
}

/// Score all eleven labels, returned in canonical label order.
pub fn score_labels(f: &Features, th: &RegimeThresholds) -> Vec<LabelScore> {
    let t = ratio(f.trend_strength, th.trend_upper);
    let m = ratio(f.momentum, th.momentum_threshold);
    let v = ratio(f.volatility, th.vol_upper);
    let quiet = if f.volatility <= 0.0 {
        MAX_LABEL_SCORE
    } else {
        th.vol_lower / f.volatility
    };
    let d = ratio(f.max_drawdown.abs(), th.crisis_drawdown.abs());
    let p = f.participation;
    let untrended = 1.0 - t.min(1.0);
    let trending = f.trend_strength >= th.trend_lower;

    let mut scores = [0.0_f64; 11];
    let mut set = |label: RegimeLabel, value: f64| {
        scores[index(label)] = value;
    };

    use RegimeLabel::*;
    if trending && f.trend_direction > 0.0 {
        set(BullTrending, t);
    }
    if trending && f.trend_direction < 0.0 {
        set(BearTrending, t);
    }
    set(Momentum, m.abs().min(2.0) * untrended);
    set(
        MeanReverting,
        (-f.autocorrelation / th.mean_reversion_autocorr).clamp(0.0, 2.0) * untrended,
    );
    if quiet >= 1.0 && t < 1.0 {
        set(LowVolatility, quiet.min(2.0));
    }
    set(RangeBound, untrended * (1.0 - m.abs().min(1.0)));
    if p >= th.participation_upper && f.momentum >= 0.0 {
        set(Expansion, p / th.participation_upper);
    }
    if p > 0.0 && p <= th.participation_lower {
        set(Contraction, th.participation_lower / p);
    }
    set(Neutral, NEUTRAL_BASELINE);

    if v >= 1.0 {
        for label in [BullTrending, BearTrending, Momentum, MeanReverting, LowVolatility, RangeBound] {
            set(label, 0.0);
        }
        set(HighVolatility, v);
        if d >= 1.0 {
            set(Crisis, v + d);
        }
    }

    RegimeLabel::ALL
        .iter()
        .map(|&label| {
            let raw = scores[index(label)];
            LabelScore {
                label,
                score: if raw.is_finite() { raw.clamp(0.0, MAX_LABEL_SCORE) } else { 0.0 },
                magnitude: magnitude(label, f),
            }
        })
        .collect()
}

/// Order candidates best first: score, then magnitude, then canonical order.
pub fn rank(mut scores: Vec<LabelScore>) -> Vec<LabelScore> {
    scores.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(b.magnitude.total_cmp(&a.magnitude))
            .then(index(a.label).cmp(&index(b.label)))
    });
    scores
}

fn magnitude(label: RegimeLabel, f: &Features) -> f64 {
    use RegimeLabel::*;
    let v = match label {
        BullTrending | BearTrending => f.trend_strength,
        Momentum => f.momentum.abs(),
        MeanReverting => f.autocorrelation.abs(),
        HighVolatility | LowVolatility => f.volatility,
        RangeBound => 1.0 - f.trend_strength,
        Crisis => f.max_drawdown.abs(),
        Expansion | Contraction => (f.participation - 1.0).abs(),
        Neutral => 0.0,
    };
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

fn ratio(value: f64, threshold: f64) -> f64 {
    if threshold.abs() < f64::EPSILON {
        0.0
    } else {
        value / threshold
    }
}

fn index(label: RegimeLabel) -> usize {
    RegimeLabel::ALL.iter().position(|l| *l == label).unwrap_or(RegimeLabel::ALL.len() - 1)
}
