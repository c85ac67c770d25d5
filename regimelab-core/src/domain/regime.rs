//! Regime labels, hierarchy layers, and per-layer classifications.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Qualitative market state. Closed set of eleven variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegimeLabel {
    BullTrending,
    BearTrending,
    Momentum,
    MeanReverting,
    HighVolatility,
    LowVolatility,
    RangeBound,
    Crisis,
    Expansion,
    Contraction,
    Neutral,
}

impl RegimeLabel {
    /// All labels in canonical order.
    pub const ALL: [RegimeLabel; 11] = [
        RegimeLabel::BullTrending,
        RegimeLabel::BearTrending,
        RegimeLabel::Momentum,
        RegimeLabel::MeanReverting,
        RegimeLabel::HighVolatility,
        RegimeLabel::LowVolatility,
        RegimeLabel::RangeBound,
        RegimeLabel::Crisis,
        RegimeLabel::Expansion,
        RegimeLabel::Contraction,
        RegimeLabel::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BullTrending => "bull-trending",
            Self::BearTrending => "bear-trending",
            Self::Momentum => "momentum",
            Self::MeanReverting => "mean-reverting",
            Self::HighVolatility => "high-volatility",
            Self::LowVolatility => "low-volatility",
            Self::RangeBound => "range-bound",
            Self::Crisis => "crisis",
            Self::Expansion => "expansion",
            Self::Contraction => "contraction",
            Self::Neutral => "neutral",
        }
    }
}

impl fmt::Display for RegimeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the six nested classification scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayerKind {
    Temporal,
    Macro,
    Market,
    Sector,
    Industry,
    Instrument,
}

impl LayerKind {
    /// All layers in canonical (outermost first) order.
    pub const ALL: [LayerKind; 6] = [
        LayerKind::Temporal,
        LayerKind::Macro,
        LayerKind::Market,
        LayerKind::Sector,
        LayerKind::Industry,
        LayerKind::Instrument,
    ];

    /// Order in which tied majority labels are resolved. Market comes first:
    /// it is the most liquid and most directly observable layer.
    pub const MAJORITY_PRIORITY: [LayerKind; 6] = [
        LayerKind::Market,
        LayerKind::Sector,
        LayerKind::Industry,
        LayerKind::Instrument,
        LayerKind::Macro,
        LayerKind::Temporal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Temporal => "temporal",
            Self::Macro => "macro",
            Self::Market => "market",
            Self::Sector => "sector",
            Self::Industry => "industry",
            Self::Instrument => "instrument",
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LayerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LayerKind::ALL
            .iter()
            .copied()
            .find(|l| l.as_str() == s)
            .ok_or_else(|| format!("unknown layer '{s}'"))
    }
}

/// Regime classification of a single layer at a single date.
///
/// Created fresh on every classification call and never mutated; a newer
/// classification supersedes an older one by `as_of`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerClassification {
    pub layer: LayerKind,
    pub primary: RegimeLabel,
    pub secondary: Option<RegimeLabel>,
    /// Conviction of the primary label, in [0, 1].
    pub strength: f64,
    /// Separation between the winning and runner-up label, in [0, 1].
    pub confidence: f64,
    /// Named feature values the label was derived from.
    pub characteristics: BTreeMap<String, f64>,
    pub as_of: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_serialize_kebab_case() {
        let json = serde_json::to_string(&RegimeLabel::BullTrending).unwrap();
        assert_eq!(json, "\"bull-trending\"");
        let back: RegimeLabel = serde_json::from_str("\"mean-reverting\"").unwrap();
        assert_eq!(back, RegimeLabel::MeanReverting);
    }

    #[test]
    fn display_matches_serde_name() {
        for label in RegimeLabel::ALL {
            let json = serde_json::to_string(&label).unwrap();
            assert_eq!(json, format!("\"{label}\""));
        }
        for layer in LayerKind::ALL {
            let json = serde_json::to_string(&layer).unwrap();
            assert_eq!(json, format!("\"{layer}\""));
        }
    }

    #[test]
    fn layer_from_str() {
        assert_eq!("sector".parse::<LayerKind>().unwrap(), LayerKind::Sector);
        assert!("galaxy".parse::<LayerKind>().is_err());
    }

    #[test]
    fn majority_priority_covers_every_layer() {
        for layer in LayerKind::ALL {
            assert!(LayerKind::MAJORITY_PRIORITY.contains(&layer));
        }
        assert_eq!(LayerKind::MAJORITY_PRIORITY[0], LayerKind::Market);
    }
}
