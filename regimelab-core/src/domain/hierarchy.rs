//! RegimeHierarchy: the six layer classifications of one instrument plus
//! their agreement summary.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use super::regime::{LayerClassification, LayerKind, RegimeLabel};

/// Number of layers in a hierarchy.
pub const LAYER_COUNT: usize = 6;

/// Upper bound of the alignment score.
pub const MAX_ALIGNMENT: f64 = 10.0;

#[derive(Debug, Error, PartialEq)]
pub enum HierarchyError {
    #[error("hierarchy is missing the {0} layer")]
    MissingLayer(LayerKind),

    #[error("classification for {found} stored under {expected}")]
    MisplacedLayer { expected: LayerKind, found: LayerKind },
}

/// Six nested layer classifications for one instrument.
///
/// `divergence_points` holds exactly the layers (canonical order) whose
/// primary label differs from `majority`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeHierarchy {
    pub instrument: String,
    pub temporal: LayerClassification,
    #[serde(rename = "macro")]
    pub macro_layer: LayerClassification,
    pub market: LayerClassification,
    pub sector: LayerClassification,
    pub industry: LayerClassification,
    pub instrument_level: LayerClassification,
    pub majority: RegimeLabel,
    pub alignment_score: f64,
    pub divergence_points: Vec<LayerKind>,
}

impl RegimeHierarchy {
    /// Build a hierarchy from one classification per layer, deriving the
    /// majority label, divergence points and alignment score.
    pub fn assemble(
        instrument: impl Into<String>,
        mut layers: BTreeMap<LayerKind, LayerClassification>,
    ) -> Result<Self, HierarchyError> {
        for (kind, classification) in &layers {
            if classification.layer != *kind {
                return Err(HierarchyError::MisplacedLayer {
                    expected: *kind,
                    found: classification.layer,
                });
            }
        }

        let mut take = |kind: LayerKind| layers.remove(&kind).ok_or(HierarchyError::MissingLayer(kind));
        let temporal = take(LayerKind::Temporal)?;
        let macro_layer = take(LayerKind::Macro)?;
        let market = take(LayerKind::Market)?;
        let sector = take(LayerKind::Sector)?;
        let industry = take(LayerKind::Industry)?;
        let instrument_level = take(LayerKind::Instrument)?;

        let mut hierarchy = Self {
            instrument: instrument.into(),
            temporal,
            macro_layer,
            market,
            sector,
            industry,
            instrument_level,
            majority: RegimeLabel::Neutral,
            alignment_score: 0.0,
            divergence_points: Vec::new(),
        };

        let labels: Vec<(LayerKind, RegimeLabel)> = hierarchy
            .layers()
            .iter()
            .map(|c| (c.layer, c.primary))
            .collect();
        let majority = majority_label(&labels);
        let divergence_points: Vec<LayerKind> = labels
            .iter()
            .filter(|(_, label)| *label != majority)
            .map(|(kind, _)| *kind)
            .collect();
        let agreeing: Vec<f64> = hierarchy
            .layers()
            .iter()
            .filter(|c| !divergence_points.contains(&c.layer))
            .map(|c| c.strength)
            .collect();
        let mean_strength = if agreeing.is_empty() {
            0.0
        } else {
            agreeing.iter().sum::<f64>() / agreeing.len() as f64
        };

        hierarchy.alignment_score = alignment_score(divergence_points.len(), mean_strength);
        hierarchy.majority = majority;
        hierarchy.divergence_points = divergence_points;
        Ok(hierarchy)
    }

    /// Classification for a specific layer.
    pub fn layer(&self, kind: LayerKind) -> &LayerClassification {
        match kind {
            LayerKind::Temporal => &self.temporal,
            LayerKind::Macro => &self.macro_layer,
            LayerKind::Market => &self.market,
            LayerKind::Sector => &self.sector,
            LayerKind::Industry => &self.industry,
            LayerKind::Instrument => &self.instrument_level,
        }
    }

    /// All six classifications in canonical order.
    pub fn layers(&self) -> [&LayerClassification; LAYER_COUNT] {
        [
            &self.temporal,
            &self.macro_layer,
            &self.market,
            &self.sector,
            &self.industry,
            &self.instrument_level,
        ]
    }

    /// Date of the instrument layer's last observation.
    pub fn as_of(&self) -> chrono::NaiveDate {
        self.instrument_level.as_of
    }

    /// Whether a layer agrees with the majority label.
    pub fn is_aligned(&self, kind: LayerKind) -> bool {
        !self.divergence_points.contains(&kind)
    }

    /// Layers whose primary label changed relative to an earlier snapshot.
    pub fn flipped_layers(&self, previous: &RegimeHierarchy) -> Vec<LayerKind> {
        LayerKind::ALL
            .iter()
            .copied()
            .filter(|&kind| self.layer(kind).primary != previous.layer(kind).primary)
            .collect()
    }
}

/// Label held by the most layers. Ties prefer the market layer's label, then
/// the tied label first encountered in `LayerKind::MAJORITY_PRIORITY`.
pub fn majority_label(labels: &[(LayerKind, RegimeLabel)]) -> RegimeLabel {
    let mut counts: BTreeMap<RegimeLabel, usize> = BTreeMap::new();
    for (_, label) in labels {
        *counts.entry(*label).or_insert(0) += 1;
    }
    let Some(&top) = counts.values().max() else {
        return RegimeLabel::Neutral;
    };

    for kind in LayerKind::MAJORITY_PRIORITY {
        if let Some((_, label)) = labels.iter().find(|(k, _)| *k == kind) {
            if counts.get(label) == Some(&top) {
                return *label;
            }
        }
    }

    // Only reachable when labels carry duplicate or unknown layer kinds.
    counts
        .iter()
        .find(|(_, &c)| c == top)
        .map(|(label, _)| *label)
        .unwrap_or(RegimeLabel::Neutral)
}

/// `10 * (1 - divergent / 6) * mean_strength`, clamped to [0, 10].
pub fn alignment_score(divergent: usize, mean_strength: f64) -> f64 {
    let breadth = 1.0 - divergent as f64 / LAYER_COUNT as f64;
    let score = MAX_ALIGNMENT * breadth * mean_strength;
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, MAX_ALIGNMENT)
    }
}
