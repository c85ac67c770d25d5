//! Scan requests and their validating builder.
//!
//! A request is validated in full before any data is touched. Requests
//! built with [`ScanRequestBuilder`] are valid by construction; requests
//! deserialized from TOML/JSON go through [`ScanRequest::validate`] in the
//! engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use regimelab_core::detectors::DetectorConfig;
use regimelab_core::domain::{DetectorKind, LayerKind};

/// Tolerance on the layer weight sum.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

pub const MIN_SCORE: &str = "min_score";
pub const MIN_ALIGNMENT: &str = "min_alignment";
pub const MAX_ALIGNMENT: &str = "max_alignment";
pub const MIN_FINDINGS: &str = "min_findings";

/// Threshold keys a request may carry.
pub const THRESHOLD_KEYS: [&str; 4] = [MIN_SCORE, MIN_ALIGNMENT, MAX_ALIGNMENT, MIN_FINDINGS];

const DEFAULT_TOP_N: usize = 20;

#[derive(Debug, Error, PartialEq)]
pub enum RequestError {
    #[error("universe is empty")]
    EmptyUniverse,

    #[error("unknown named universe '{0}'")]
    UnknownUniverse(String),

    #[error("weight for {name} must be finite and >= 0, got {value}")]
    InvalidWeight { name: String, value: f64 },

    #[error("layer weights must sum to 1.0, got {0}")]
    LayerWeightSum(f64),

    #[error("top_n must be greater than zero")]
    ZeroTopN,

    #[error("unknown threshold '{0}' (expected one of min_score, min_alignment, max_alignment, min_findings)")]
    UnknownThreshold(String),

    #[error("threshold {key} must be finite, got {value}")]
    InvalidThreshold { key: String, value: f64 },

    #[error("min_alignment {min} exceeds max_alignment {max}")]
    AlignmentBounds { min: f64, max: f64 },

    #[error("hybrid mode needs at least one positive detector weight")]
    HybridWithoutDetectors,

    #[error("detector {0} has a positive weight but no config")]
    MissingDetectorConfig(DetectorKind),

    #[error("detector {0} is configured more than once")]
    DuplicateDetector(DetectorKind),

    #[error("invalid {kind} parameters: {reason}")]
    InvalidDetector { kind: DetectorKind, reason: String },
}

/// What the scan looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScanMode {
    /// Layers agreeing with each other.
    Alignment,
    /// Layers disagreeing.
    Divergence,
    /// Alignment plus at least one detector finding.
    Hybrid,
    /// Layers whose label flipped since the previous snapshot.
    Transition,
}

impl ScanMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alignment => "alignment",
            Self::Divergence => "divergence",
            Self::Hybrid => "hybrid",
            Self::Transition => "transition",
        }
    }
}

impl std::fmt::Display for ScanMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ScanMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "alignment" => Ok(Self::Alignment),
            "divergence" => Ok(Self::Divergence),
            "hybrid" => Ok(Self::Hybrid),
            "transition" => Ok(Self::Transition),
            other => Err(format!("unknown scan mode '{other}'")),
        }
    }
}

/// Explicit symbols or a catalog name (`all`, a sector, an industry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UniverseSpec {
    Symbols(Vec<String>),
    Named(String),
}

/// A complete, self-describing scan definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRequest {
    pub universe: UniverseSpec,
    pub mode: ScanMode,
    pub layer_weights: BTreeMap<LayerKind, f64>,
    #[serde(default)]
    pub detector_weights: BTreeMap<DetectorKind, f64>,
    #[serde(default)]
    pub detectors: Vec<DetectorConfig>,
    #[serde(default)]
    pub thresholds: BTreeMap<String, f64>,
    pub top_n: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// Equal weight on every layer.
pub fn equal_layer_weights() -> BTreeMap<LayerKind, f64> {
    LayerKind::ALL
        .iter()
        .map(|&k| (k, 1.0 / LayerKind::ALL.len() as f64))
        .collect()
}

impl ScanRequest {
    pub fn builder(universe: UniverseSpec, mode: ScanMode) -> ScanRequestBuilder {
        ScanRequestBuilder::new(universe, mode)
    }

    pub fn threshold(&self, key: &str) -> Option<f64> {
        self.thresholds.get(key).copied()
    }

    pub fn layer_weight(&self, layer: LayerKind) -> f64 {
        self.layer_weights.get(&layer).copied().unwrap_or(0.0)
    }

    pub fn detector_weight(&self, kind: DetectorKind) -> f64 {
        self.detector_weights.get(&kind).copied().unwrap_or(0.0)
    }

    /// Add a default config for every positively weighted detector that has
    /// none.
    pub fn with_default_detectors(mut self) -> Self {
        for (&kind, &weight) in &self.detector_weights {
            if weight > 0.0 && !self.detectors.iter().any(|d| d.kind() == kind) {
                self.detectors.push(DetectorConfig::default_for(kind));
            }
        }
        self
    }

    /// Full validation except named-universe resolution, which needs the
    /// engine's catalog.
    pub fn validate(&self) -> Result<(), RequestError> {
        match &self.universe {
            UniverseSpec::Symbols(symbols) if symbols.iter().all(|s| s.trim().is_empty()) => {
                return Err(RequestError::EmptyUniverse)
            }
            UniverseSpec::Named(name) if name.trim().is_empty() => {
                return Err(RequestError::EmptyUniverse)
            }
            _ => {}
        }

        for (layer, &w) in &self.layer_weights {
            check_weight(layer.as_str(), w)?;
        }
        for (kind, &w) in &self.detector_weights {
            check_weight(kind.as_str(), w)?;
        }
        let sum: f64 = self.layer_weights.values().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(RequestError::LayerWeightSum(sum));
        }

        if self.top_n == 0 {
            return Err(RequestError::ZeroTopN);
        }

        for (key, &value) in &self.thresholds {
            if !THRESHOLD_KEYS.contains(&key.as_str()) {
                return Err(RequestError::UnknownThreshold(key.clone()));
            }
            if !value.is_finite() {
                return Err(RequestError::InvalidThreshold {
                    key: key.clone(),
                    value,
                });
            }
        }
        if let (Some(min), Some(max)) = (self.threshold(MIN_ALIGNMENT), self.threshold(MAX_ALIGNMENT)) {
            if min > max {
                return Err(RequestError::AlignmentBounds { min, max });
            }
        }

        if self.mode == ScanMode::Hybrid && !self.detector_weights.values().any(|w| *w > 0.0) {
            return Err(RequestError::HybridWithoutDetectors);
        }

        let mut seen = Vec::new();
        for config in &self.detectors {
            let kind = config.kind();
            if seen.contains(&kind) {
                return Err(RequestError::DuplicateDetector(kind));
            }
            seen.push(kind);
            config
                .detector()
                .validate()
                .map_err(|reason| RequestError::InvalidDetector { kind, reason })?;
        }
        for (&kind, &w) in &self.detector_weights {
            if w > 0.0 && !seen.contains(&kind) {
                return Err(RequestError::MissingDetectorConfig(kind));
            }
        }
        Ok(())
    }

    /// Content hash of the canonical request, for external result caches.
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&json).to_hex().to_string()
    }
}

fn check_weight(name: &str, value: f64) -> Result<(), RequestError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(RequestError::InvalidWeight {
            name: name.to_string(),
            value,
        })
    }
}

/// Validating builder. Unset layer weights default to equal weights,
/// `top_n` to 20.
#[derive(Debug, Clone)]
pub struct ScanRequestBuilder {
    universe: UniverseSpec,
    mode: ScanMode,
    layer_weights: Option<BTreeMap<LayerKind, f64>>,
    detector_weights: BTreeMap<DetectorKind, f64>,
    detectors: Vec<DetectorConfig>,
    thresholds: BTreeMap<String, f64>,
    top_n: usize,
    timeout_ms: Option<u64>,
}

impl ScanRequestBuilder {
    pub fn new(universe: UniverseSpec, mode: ScanMode) -> Self {
        Self {
            universe,
            mode,
            layer_weights: None,
            detector_weights: BTreeMap::new(),
            detectors: Vec::new(),
            thresholds: BTreeMap::new(),
            top_n: DEFAULT_TOP_N,
            timeout_ms: None,
        }
    }

    pub fn layer_weight(mut self, layer: LayerKind, weight: f64) -> Self {
        self.layer_weights
            .get_or_insert_with(BTreeMap::new)
            .insert(layer, weight);
        self
    }

    pub fn layer_weights(mut self, weights: BTreeMap<LayerKind, f64>) -> Self {
        self.layer_weights = Some(weights);
        self
    }

    pub fn detector_weight(mut self, kind: DetectorKind, weight: f64) -> Self {
        self.detector_weights.insert(kind, weight);
        self
    }

    /// Add a detector config; replaces an earlier config of the same kind.
    pub fn detector(mut self, config: DetectorConfig) -> Self {
        self.detectors.retain(|d| d.kind() != config.kind());
        self.detectors.push(config);
        self
    }

    pub fn threshold(mut self, key: impl Into<String>, value: f64) -> Self {
        self.thresholds.insert(key.into(), value);
        self
    }

    pub fn top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn build(self) -> Result<ScanRequest, RequestError> {
        let request = ScanRequest {
            universe: self.universe,
            mode: self.mode,
            layer_weights: self.layer_weights.unwrap_or_else(equal_layer_weights),
            detector_weights: self.detector_weights,
            detectors: self.detectors,
            thresholds: self.thresholds,
            top_n: self.top_n,
            timeout_ms: self.timeout_ms,
        }
        .with_default_detectors();
        request.validate()?;
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regimelab_core::detectors::PairParams;

    fn symbols() -> UniverseSpec {
        UniverseSpec::Symbols(vec!["AAPL".into(), "MSFT".into()])
    }

    #[test]
    fn builder_defaults_are_valid() {
        let req = ScanRequest::builder(symbols(), ScanMode::Alignment).build().unwrap();
        assert_eq!(req.top_n, 20);
        let sum: f64 = req.layer_weights.values().sum();
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn weight_sum_is_enforced() {
        let err = ScanRequest::builder(symbols(), ScanMode::Alignment)
            .layer_weight(LayerKind::Market, 0.5)
            .layer_weight(LayerKind::Sector, 0.4)
            .build()
            .unwrap_err();
        assert!(matches!(err, RequestError::LayerWeightSum(s) if (s - 0.9).abs() < 1e-12));
    }

    #[test]
    fn weight_sum_within_tolerance_passes() {
        let req = ScanRequest::builder(symbols(), ScanMode::Alignment)
            .layer_weight(LayerKind::Market, 0.6)
            .layer_weight(LayerKind::Sector, 0.4 + 5e-7)
            .build();
        assert!(req.is_ok());
    }

    #[test]
    fn negative_and_nan_weights_are_rejected() {
        let err = ScanRequest::builder(symbols(), ScanMode::Alignment)
            .detector_weight(DetectorKind::PatternMatch, -0.1)
            .build()
            .unwrap_err();
        assert!(matches!(err, RequestError::InvalidWeight { .. }));

        let err = ScanRequest::builder(symbols(), ScanMode::Alignment)
            .layer_weight(LayerKind::Market, f64::NAN)
            .build()
            .unwrap_err();
        assert!(matches!(err, RequestError::InvalidWeight { .. }));
    }

    #[test]
    fn empty_universe_and_zero_top_n() {
        assert_eq!(
            ScanRequest::builder(UniverseSpec::Symbols(vec![]), ScanMode::Alignment)
                .build()
                .unwrap_err(),
            RequestError::EmptyUniverse
        );
        assert_eq!(
            ScanRequest::builder(symbols(), ScanMode::Alignment)
                .top_n(0)
                .build()
                .unwrap_err(),
            RequestError::ZeroTopN
        );
    }

    #[test]
    fn unknown_threshold_key_is_rejected() {
        let err = ScanRequest::builder(symbols(), ScanMode::Alignment)
            .threshold("min_sharpe", 1.0)
            .build()
            .unwrap_err();
        assert_eq!(err, RequestError::UnknownThreshold("min_sharpe".into()));
    }

    #[test]
    fn alignment_bounds_must_be_ordered() {
        let err = ScanRequest::builder(symbols(), ScanMode::Alignment)
            .threshold(MIN_ALIGNMENT, 7.0)
            .threshold(MAX_ALIGNMENT, 3.0)
            .build()
            .unwrap_err();
        assert!(matches!(err, RequestError::AlignmentBounds { .. }));
    }

    #[test]
    fn hybrid_requires_a_detector() {
        assert_eq!(
            ScanRequest::builder(symbols(), ScanMode::Hybrid).build().unwrap_err(),
            RequestError::HybridWithoutDetectors
        );
        let req = ScanRequest::builder(symbols(), ScanMode::Hybrid)
            .detector_weight(DetectorKind::LiquidityVacuum, 1.0)
            .build()
            .unwrap();
        assert_eq!(req.detectors.len(), 1);
        assert_eq!(req.detectors[0].kind(), DetectorKind::LiquidityVacuum);
    }

    #[test]
    fn deserialized_request_without_config_is_invalid() {
        let mut req = ScanRequest::builder(symbols(), ScanMode::Alignment).build().unwrap();
        req.detector_weights.insert(DetectorKind::PatternMatch, 0.5);
        assert_eq!(
            req.validate().unwrap_err(),
            RequestError::MissingDetectorConfig(DetectorKind::PatternMatch)
        );
        assert!(req.with_default_detectors().validate().is_ok());
    }

    #[test]
    fn detector_params_are_range_checked() {
        let err = ScanRequest::builder(symbols(), ScanMode::Alignment)
            .detector(DetectorConfig::PairCointegration(PairParams {
                max_half_life: -1.0,
                ..PairParams::default()
            }))
            .build()
            .unwrap_err();
        assert!(matches!(err, RequestError::InvalidDetector { .. }));
    }

    #[test]
    fn fingerprint_is_stable_and_sensitive() {
        let a = ScanRequest::builder(symbols(), ScanMode::Alignment).build().unwrap();
        let b = ScanRequest::builder(symbols(), ScanMode::Alignment).build().unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        let c = ScanRequest::builder(symbols(), ScanMode::Alignment)
            .top_n(5)
            .build()
            .unwrap();
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn toml_roundtrip() {
        let req = ScanRequest::builder(UniverseSpec::Named("Technology".into()), ScanMode::Hybrid)
            .detector_weight(DetectorKind::PairCointegration, 0.8)
            .threshold(MIN_FINDINGS, 1.0)
            .timeout_ms(5_000)
            .build()
            .unwrap();
        let text = toml::to_string(&req).unwrap();
        let back: ScanRequest = toml::from_str(&text).unwrap();
        assert_eq!(req, back);
    }
}
