//! DetectorSet: five independent statistical detectors.
//!
//! Each detector reads instrument-level series through the provider traits
//! and either asserts its condition with a typed [`DetectorFinding`] or
//! returns `None` when its minimum-evidence threshold is not cleared. "No
//! finding" is never an error; only missing inputs are.

pub mod correlation;
pub mod liquidity;
pub mod pair;
pub mod pattern;
pub mod sentiment;

pub use correlation::BreakdownParams;
pub use liquidity::LiquidityParams;
pub use pair::{PairParams, PairStatistics};
pub use pattern::{PatternParams, ReferencePattern};
pub use sentiment::SentimentParams;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::{CalendarProvider, DataError, MarketDataProvider, SentimentProvider};
use crate::domain::{DetectorFinding, DetectorKind, InstrumentProfile};

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("{kind} input '{symbol}' unavailable: {source}")]
    Data {
        kind: DetectorKind,
        symbol: String,
        #[source]
        source: DataError,
    },

    #[error("{0} requires a sentiment provider")]
    MissingSentimentProvider(DetectorKind),

    #[error("invalid {kind} parameters: {reason}")]
    InvalidParams { kind: DetectorKind, reason: String },
}

/// Everything a detector may read for one instrument.
#[derive(Clone, Copy)]
pub struct DetectorInputs<'a> {
    pub profile: &'a InstrumentProfile,
    pub market: &'a dyn MarketDataProvider,
    pub calendar: &'a dyn CalendarProvider,
    pub sentiment: Option<&'a dyn SentimentProvider>,
}

impl<'a> DetectorInputs<'a> {
    pub fn symbol(&self) -> &'a str {
        &self.profile.symbol
    }

    /// Fetch a series, attributing failures to `kind`.
    pub(crate) fn series(
        &self,
        kind: DetectorKind,
        symbol: &str,
        lookback: usize,
    ) -> Result<Vec<crate::domain::Observation>, DetectError> {
        self.market
            .get_series(symbol, lookback)
            .map_err(|source| DetectError::Data {
                kind,
                symbol: symbol.to_string(),
                source,
            })
    }
}

/// A detector parameterized by its own config.
pub trait Detector: Send + Sync {
    fn kind(&self) -> DetectorKind;

    /// Range-check parameters.
    fn validate(&self) -> Result<(), String>;

    fn detect(&self, inputs: &DetectorInputs<'_>) -> Result<Option<DetectorFinding>, DetectError>;
}

/// Detector selection plus parameters. Closed set, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DetectorConfig {
    PatternMatch(PatternParams),
    PairCointegration(PairParams),
    CorrelationBreakdown(BreakdownParams),
    LiquidityVacuum(LiquidityParams),
    SentimentDivergence(SentimentParams),
}

impl DetectorConfig {
    /// Config with default parameters for `kind`.
    pub fn default_for(kind: DetectorKind) -> Self {
        match kind {
            DetectorKind::PatternMatch => Self::PatternMatch(PatternParams::default()),
            DetectorKind::PairCointegration => Self::PairCointegration(PairParams::default()),
            DetectorKind::CorrelationBreakdown => {
                Self::CorrelationBreakdown(BreakdownParams::default())
            }
            DetectorKind::LiquidityVacuum => Self::LiquidityVacuum(LiquidityParams::default()),
            DetectorKind::SentimentDivergence => {
                Self::SentimentDivergence(SentimentParams::default())
            }
        }
    }

    pub fn kind(&self) -> DetectorKind {
        self.detector().kind()
    }

    pub fn detector(&self) -> &dyn Detector {
        match self {
            Self::PatternMatch(p) => p,
            Self::PairCointegration(p) => p,
            Self::CorrelationBreakdown(p) => p,
            Self::LiquidityVacuum(p) => p,
            Self::SentimentDivergence(p) => p,
        }
    }

    pub fn validate(&self) -> Result<(), DetectError> {
        self.detector()
            .validate()
            .map_err(|reason| DetectError::InvalidParams {
                kind: self.kind(),
                reason,
            })
    }
}

/// The configured detectors of one scan, run in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectorSet {
    configs: Vec<DetectorConfig>,
}

impl DetectorSet {
    pub fn new(configs: Vec<DetectorConfig>) -> Self {
        Self { configs }
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    pub fn kinds(&self) -> Vec<DetectorKind> {
        self.configs.iter().map(DetectorConfig::kind).collect()
    }

    /// Run every detector. The first input failure aborts; detectors that
    /// find nothing contribute nothing.
    pub fn run(&self, inputs: &DetectorInputs<'_>) -> Result<Vec<DetectorFinding>, DetectError> {
        let mut findings = Vec::new();
        for config in &self.configs {
            if let Some(finding) = config.detector().detect(inputs)? {
                tracing::debug!(
                    symbol = inputs.symbol(),
                    kind = %finding.kind(),
                    score = finding.score,
                    "finding"
                );
                findings.push(finding);
            }
        }
        Ok(findings)
    }
}
