//! Scan output types.

use serde::{Deserialize, Serialize};
use std::fmt;

use regimelab_core::domain::{DetectorFinding, RegimeHierarchy};

use crate::request::ScanMode;

/// One ranked instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanEntry {
    pub instrument: String,
    pub composite_score: f64,
    pub hierarchy: Option<RegimeHierarchy>,
    pub findings: Vec<DetectorFinding>,
}

impl ScanEntry {
    pub fn alignment_score(&self) -> Option<f64> {
        self.hierarchy.as_ref().map(|h| h.alignment_score)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// The instrument's own history is too short.
    InsufficientData,
    /// A provider failed or returned nothing usable.
    DataUnavailable,
    /// A reference layer (industry, sector, market, macro) could not be
    /// classified.
    LayerUnavailable,
    /// The scan deadline passed before the instrument finished.
    Timeout,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InsufficientData => "insufficient-data",
            Self::DataUnavailable => "data-unavailable",
            Self::LayerUnavailable => "layer-unavailable",
            Self::Timeout => "timeout",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedInstrument {
    pub instrument: String,
    pub reason: SkipReason,
    pub detail: String,
}

/// Counters for one scan. `requested = scored + skipped + no_signal`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    pub requested: usize,
    pub scored: usize,
    pub skipped: usize,
    /// Hybrid-mode instruments with no detector finding.
    pub no_signal: usize,
    pub filtered_out: usize,
    pub returned: usize,
    pub workers: usize,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub mode: ScanMode,
    /// Best first, at most `top_n`.
    pub results: Vec<ScanEntry>,
    /// In universe order.
    pub skipped: Vec<SkippedInstrument>,
    /// The deadline passed before every instrument finished.
    pub partial: bool,
    pub stats: ScanStats,
    /// Fingerprint of the request that produced this result.
    pub fingerprint: String,
    /// Every hierarchy built during the scan, in universe order, whether or
    /// not it was scored. Callers record these for later transition scans.
    #[serde(default, skip_serializing)]
    pub snapshots: Vec<RegimeHierarchy>,
}

impl ScanResult {
    pub fn skipped_for(&self, instrument: &str) -> Option<&SkippedInstrument> {
        self.skipped.iter().find(|s| s.instrument == instrument)
    }

    pub fn instruments(&self) -> Vec<&str> {
        self.results.iter().map(|e| e.instrument.as_str()).collect()
    }
}
