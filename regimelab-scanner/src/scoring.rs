//! Composite scores and result filtering.
//!
//! Scores are pure functions of a candidate and the request: no data access
//! happens here.

use std::collections::BTreeMap;

use regimelab_core::domain::{DetectorFinding, DetectorKind, LayerKind, RegimeHierarchy};
use regimelab_core::domain::hierarchy::MAX_ALIGNMENT;

use crate::request::{ScanMode, ScanRequest, MAX_ALIGNMENT as MAX_ALIGNMENT_KEY};
use crate::request::{MIN_ALIGNMENT, MIN_FINDINGS, MIN_SCORE};
use crate::result::ScanEntry;

/// Everything fetched for one instrument.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub instrument: String,
    pub hierarchy: RegimeHierarchy,
    /// Prior snapshot; present in transition scans.
    pub previous: Option<RegimeHierarchy>,
    pub findings: Vec<DetectorFinding>,
}

/// `alignment_score × Σ w_i` over the layers that agree with the majority.
pub fn alignment_component(hierarchy: &RegimeHierarchy, weights: &BTreeMap<LayerKind, f64>) -> f64 {
    let aligned_weight: f64 = weights
        .iter()
        .filter(|(layer, _)| hierarchy.is_aligned(**layer))
        .map(|(_, w)| w)
        .sum();
    hierarchy.alignment_score * aligned_weight
}

pub fn divergence_component(hierarchy: &RegimeHierarchy) -> f64 {
    MAX_ALIGNMENT - hierarchy.alignment_score
}

/// Half alignment, half the weighted share of layers whose primary label
/// changed since `previous`.
pub fn transition_component(
    hierarchy: &RegimeHierarchy,
    previous: &RegimeHierarchy,
    weights: &BTreeMap<LayerKind, f64>,
) -> f64 {
    let flipped_weight: f64 = hierarchy
        .flipped_layers(previous)
        .iter()
        .map(|layer| weights.get(layer).copied().unwrap_or(0.0))
        .sum();
    0.5 * alignment_component(hierarchy, weights) + 0.5 * MAX_ALIGNMENT * flipped_weight
}

pub fn finding_component(findings: &[DetectorFinding], weights: &BTreeMap<DetectorKind, f64>) -> f64 {
    findings
        .iter()
        .map(|f| f.score * weights.get(&f.kind()).copied().unwrap_or(0.0))
        .sum()
}

/// Findings from detectors the request weights positively.
pub fn qualifying_findings(findings: &[DetectorFinding], weights: &BTreeMap<DetectorKind, f64>) -> usize {
    findings
        .iter()
        .filter(|f| weights.get(&f.kind()).is_some_and(|w| *w > 0.0))
        .count()
}

/// Composite score, or `None` when the candidate is excluded from the scan.
///
/// Hybrid scans exclude candidates without a qualifying finding; a missing
/// prior snapshot excludes a transition candidate.
pub fn composite(request: &ScanRequest, candidate: &Candidate) -> Option<f64> {
    let h = &candidate.hierarchy;
    let base = match request.mode {
        ScanMode::Alignment => alignment_component(h, &request.layer_weights),
        ScanMode::Hybrid => {
            if qualifying_findings(&candidate.findings, &request.detector_weights) == 0 {
                return None;
            }
            alignment_component(h, &request.layer_weights)
        }
        ScanMode::Divergence => divergence_component(h),
        ScanMode::Transition => {
            let previous = candidate.previous.as_ref()?;
            transition_component(h, previous, &request.layer_weights)
        }
    };
    Some(base + finding_component(&candidate.findings, &request.detector_weights))
}

/// Apply request thresholds. `default_min_score` stands in for a missing
/// `min_score`; `min_findings` counts qualifying findings only.
pub fn passes_filters(entry: &ScanEntry, request: &ScanRequest, default_min_score: f64) -> bool {
    let min_score = request.threshold(MIN_SCORE).unwrap_or(default_min_score);
    if entry.composite_score < min_score {
        return false;
    }
    if let Some(alignment) = entry.alignment_score() {
        if request.threshold(MIN_ALIGNMENT).is_some_and(|min| alignment < min) {
            return false;
        }
        if request.threshold(MAX_ALIGNMENT_KEY).is_some_and(|max| alignment > max) {
            return false;
        }
    }
    match request.threshold(MIN_FINDINGS) {
        Some(min) => qualifying_findings(&entry.findings, &request.detector_weights) as f64 >= min,
        None => true,
    }
}
